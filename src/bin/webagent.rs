use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use webagent::cli::{
    check_action_files, check_observation_file, inspect_plan_file, validate_goal_file,
    PlanInspection,
};
use webagent::contract::Verdict;
use webagent::utils::LoggingConfig;
use webagent::{log_error, log_warn, RuntimeConfig};

#[derive(Parser)]
#[command(name = "webagent", version, about = "Web automation agent contract tools", author)]
struct Cli {
    /// 以 JSON 输出结果
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Goal {
        #[command(subcommand)]
        command: GoalCommand,
    },
    Action {
        #[command(subcommand)]
        command: ActionCommand,
    },
    Observation {
        #[command(subcommand)]
        command: ObservationCommand,
    },
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum GoalCommand {
    Validate { file: PathBuf },
}

#[derive(Subcommand)]
enum ActionCommand {
    Check {
        #[arg(long)]
        goal: PathBuf,
        #[arg(long)]
        action: PathBuf,
        /// 按内置工具目录检查参数
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum ObservationCommand {
    Check {
        file: PathBuf,
        /// 该观察是本步的第一次观察
        #[arg(long)]
        first: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommand {
    Inspect { file: PathBuf },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// 输出生效的运行时配置（文件，再叠加 WEBAGENT_* 覆盖）
    Show {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    LoggingConfig::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            log_error!(err);
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

/// 返回输入是否通过检查
fn run(cli: Cli) -> webagent::Result<bool> {
    let json = cli.json;
    match cli.command {
        Command::Goal {
            command: GoalCommand::Validate { file },
        } => {
            let (goal, verdict) = validate_goal_file(&file)?;
            report_verdict(&format!("goal {}", goal.step_key()), &verdict, json)
        }
        Command::Action {
            command: ActionCommand::Check { goal, action, strict },
        } => match check_action_files(&goal, &action, strict)? {
            Ok(action) => {
                if json {
                    print_json(&serde_json::json!({ "valid": true, "action": action }))?;
                } else {
                    println!("action `{}` accepted", action.tool_name);
                }
                Ok(true)
            }
            Err(err) => {
                if json {
                    print_json(&serde_json::json!({
                        "valid": false,
                        "code": err.code(),
                        "error": err,
                    }))?;
                } else {
                    println!("action rejected [{}]: {}", err.code(), err);
                }
                Ok(false)
            }
        },
        Command::Observation {
            command: ObservationCommand::Check { file, first },
        } => {
            let (observation, verdict) = check_observation_file(&file, first)?;
            report_verdict(&format!("observation of {}", observation.current_url), &verdict, json)
        }
        Command::Plan {
            command: PlanCommand::Inspect { file },
        } => {
            let inspection = inspect_plan_file(&file)?;
            for warning in &inspection.warnings {
                log_warn!("plan inspection warning", warning = warning.as_str());
            }
            if json {
                print_json(&inspection)?;
            } else {
                render_plan(&inspection);
            }
            Ok(inspection.warnings.is_empty())
        }
        Command::Config {
            command: ConfigCommand::Show { file },
        } => {
            let config = RuntimeConfig::load(file.as_deref())?;
            print_json(&config)?;
            Ok(true)
        }
    }
}

fn report_verdict(subject: &str, verdict: &Verdict, json: bool) -> webagent::Result<bool> {
    if json {
        print_json(verdict)?;
    } else if verdict.is_valid() {
        println!("{subject}: valid");
    } else {
        println!("{subject}: {} violation(s)", verdict.violations().len());
        for violation in verdict.violations() {
            println!("  - [{}] {}", violation.label(), violation);
        }
    }
    Ok(verdict.is_valid())
}

fn render_plan(inspection: &PlanInspection) {
    println!("root: {}", inspection.root.as_deref().unwrap_or("-"));
    println!("{:<32} {:<8} {:<20} {}", "Node", "Priority", "Tool", "Status");
    for entry in &inspection.nodes {
        let label = format!("{}{}", "  ".repeat(entry.depth), entry.node_id);
        println!(
            "{:<32} {:<8} {:<20} {}",
            label, entry.priority, entry.tool_name, entry.status
        );
    }
    if !inspection.references.is_empty() {
        println!("dynamic references:");
        for reference in &inspection.references {
            println!(
                "  {}.{} <- result_of {}",
                reference.node_id, reference.key, reference.source_node
            );
        }
    }
    for warning in &inspection.warnings {
        println!("warning: {warning}");
    }
    println!("{}", inspection.summary);
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> webagent::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
