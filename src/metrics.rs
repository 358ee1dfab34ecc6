use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Histogram, HistogramVec, IntCounter, IntCounterVec,
};

lazy_static::lazy_static! {
    pub static ref QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "hwr_queries_total", "Total search queries", &["status"]
    ).unwrap();
    pub static ref QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "hwr_query_duration_seconds", "Search query duration", &["status"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();
    pub static ref DATASET_LOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "hwr_dataset_loads_total", "Dataset load attempts", &["status"]
    ).unwrap();
    pub static ref DATASET_LOAD_DURATION: Histogram = register_histogram!(
        "hwr_dataset_load_duration_seconds", "Dataset fetch, extract and open duration",
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]
    ).unwrap();
    pub static ref ARCHIVE_MEMBERS_TOTAL: IntCounter = register_int_counter!(
        "hwr_archive_members_total", "Archive members extracted"
    ).unwrap();
}

pub fn init() {
    lazy_static::initialize(&QUERIES_TOTAL);
    lazy_static::initialize(&QUERY_DURATION);
    lazy_static::initialize(&DATASET_LOADS_TOTAL);
    lazy_static::initialize(&DATASET_LOAD_DURATION);
    lazy_static::initialize(&ARCHIVE_MEMBERS_TOTAL);
}
