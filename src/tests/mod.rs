mod test_decomposer;
mod test_ranker;
mod test_tolerance;

pub(crate) fn init() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
