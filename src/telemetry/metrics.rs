use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("post-metrics-report"));

pub static REPORT_STEP_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("report.step.duration")
        .with_description("Duration of one catalog step in seconds")
        .with_unit("s")
        .build()
});

pub static REPORT_STEP_DOCUMENTS: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("report.step.documents")
        .with_description("Documents or group rows returned by a catalog step")
        .with_unit("{document}")
        .build()
});

pub static REPORT_STEPS_FAILED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("report.steps.failed")
        .with_description("Number of catalog steps that failed")
        .with_unit("{step}")
        .build()
});

pub static REPORT_RUNS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("report.runs.total")
        .with_description("Number of report runs, by outcome")
        .with_unit("{run}")
        .build()
});
