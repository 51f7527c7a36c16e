mod app;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use app::App;

#[derive(Parser)]
#[command(name = "focal-cli", about = "Project and task tracker over a live-syncing board", version)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Show the dashboard
    List,

    /// Create a new project
    Create {
        /// Project title
        title: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },

    /// Show one project and its tasks
    Show {
        /// Project id or title prefix
        project: String,
    },

    /// Task operations on a project
    #[command(subcommand)]
    Task(TaskCommand),

    /// Delete a project for every user of the collection
    Rm {
        /// Project id or title prefix
        project: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Write a JSON backup of the whole board
    Export {
        /// Target directory (defaults to the download directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Keep rendering the dashboard as live updates arrive
    Watch,
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add a task to a project
    Add {
        /// Project id or title prefix
        project: String,
        /// Task text
        text: String,
    },
    /// Toggle a task's completed flag
    Toggle {
        /// Project id or title prefix
        project: String,
        /// Task id or text prefix
        task: String,
    },
    /// Remove a task from a project
    Rm {
        /// Project id or title prefix
        project: String,
        /// Task id or text prefix
        task: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color;

    let mut app = App::connect()?;
    app.wait_ready().await?;

    match cli.command {
        Command::List => {
            let board = app.manager.board();
            let board = board.lock().unwrap();
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(board.projects())?)
                }
                OutputFormat::Plain => println!("{}", render::dashboard(&board, use_color)),
            }
        }

        Command::Create { title, description } => {
            app.manager.open_create();
            app.manager
                .set_project_form(title, description.unwrap_or_default());
            let id = app.manager.create_project().await?;
            println!("Created project {}", id);
        }

        Command::Show { project } => {
            let project = app.find_project(&project)?;
            app.manager.open_project(&project.id);
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&project)?),
                OutputFormat::Plain => {
                    println!("{}", render::project_detail(&project, use_color))
                }
            }
        }

        Command::Task(task_command) => {
            run_task_command(&mut app, task_command, use_color).await?;
        }

        Command::Rm { project, yes } => {
            let project = app.find_project(&project)?;
            let confirmed = yes
                || app.confirm(&format!(
                    "Delete '{}' for every user of this board?",
                    project.title
                ))?;
            if !confirmed {
                println!("Aborted.");
            } else {
                app.manager.delete_project(&project.id).await?;
                println!("Deleted '{}'", project.title);
            }
        }

        Command::Export { out } => {
            let artifact = app.manager.export_backup()?;
            let dir = match out {
                Some(dir) => dir,
                None => dirs::download_dir()
                    .or_else(|| std::env::current_dir().ok())
                    .context("no writable output directory")?,
            };
            let path = dir.join(&artifact.filename);
            std::fs::write(&path, &artifact.contents)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Exported to {}", path.display());
        }

        Command::Watch => {
            loop {
                let board = app.manager.board();
                {
                    let board = board.lock().unwrap();
                    if board.load_failed() {
                        anyhow::bail!("subscription failed; restart to reconnect");
                    }
                    println!("{}", render::dashboard(&board, use_color));
                    println!("{}", render::paint_rule(use_color));
                }
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = app.next_change() => changed?,
                }
            }
        }
    }

    app.manager.shutdown();
    Ok(())
}

/// Select the target project, then run one task mutation against it.
async fn run_task_command(app: &mut App, command: TaskCommand, use_color: bool) -> Result<()> {
    let (project_ref, action): (&str, _) = match &command {
        TaskCommand::Add { project, .. } => (project, "add"),
        TaskCommand::Toggle { project, .. } => (project, "toggle"),
        TaskCommand::Rm { project, .. } => (project, "rm"),
    };
    let project = app.find_project(project_ref)?;
    app.manager.open_project(&project.id);
    log::debug!("task {} on project {}", action, project.id);

    match command {
        TaskCommand::Add { text, .. } => {
            app.manager.set_task_input(text);
            app.manager.add_task().await?;
        }
        TaskCommand::Toggle { task, .. } => {
            let task = app.find_task(&project, &task)?;
            app.manager.toggle_task(&task.id).await?;
        }
        TaskCommand::Rm { task, .. } => {
            let task = app.find_task(&project, &task)?;
            app.manager.delete_task(&task.id).await?;
        }
    }

    let board = app.manager.board();
    let board = board.lock().unwrap();
    if let Some(selected) = board.selected_project() {
        println!("{}", render::project_detail(selected, use_color));
    }
    Ok(())
}
