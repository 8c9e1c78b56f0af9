
/// Route crate logs to the test harness; filter with `RUST_LOG`
///
/// 将本库日志输出到测试框架；通过 `RUST_LOG` 过滤
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
