// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use routerkey::config::Config;

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_tracing(&config);
    routerkey::ensure_crypto();

    let code = routerkey::command::run(config).await;
    std::process::exit(code);
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    match config.log_format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
}
