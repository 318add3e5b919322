use argh::FromArgs;
use log::debug;
use shell::Shell;

use crate::utils::config::Config;
use crate::utils::log::init_logger;

mod shell;
mod utils;

/// forksh: 基于 fork/exec 的命令执行 shell
#[derive(FromArgs)]
struct Args {
    /// 只执行这一行命令，然后以它的退出码退出
    #[argh(option, short = 'c')]
    command: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();
    let config = Config::new();
    if let Err(e) = init_logger(&config) {
        eprintln!("{}: 无法初始化日志: {}", config.name, e);
    }
    debug!("配置加载成功 {}", config.config_dir.display());

    let mut shell = Shell::new(&config);
    let code = match args.command {
        Some(line) => shell.run_line(&line),
        None => shell.run()?,
    };
    std::process::exit(code)
}
