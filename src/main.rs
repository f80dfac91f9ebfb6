use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::path::PathBuf;
use tasklist::{Backend, Clock, Config, Filter, Persistence, SystemClock, Task, TaskField, TaskStore};

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Tasklist CLI - Create, complete, filter and delete tasks")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Config file (default: <config dir>/tasklist/tasklist.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage backend: file or sqlite
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Directory holding the task file or database
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Slot key the list is saved under
    #[arg(short, long)]
    key: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add { title: String, description: String },

    /// Mark a task done, or not done again
    Toggle { sno: u64 },

    /// Delete a task
    Delete { sno: u64 },

    /// List tasks
    List {
        /// all, completed or pending
        #[arg(short, long, default_value = "all")]
        filter: Filter,
    },

    /// Show completion statistics
    Stats,
}

type Store = TaskStore<Box<dyn Persistence>, SystemClock>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(key) = cli.key {
        config.key = key;
    }

    // Setup tracing
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        config.tracing_level()
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut store = TaskStore::open(config.open_slot()?, SystemClock);

    match cli.command {
        Commands::Add { title, description } => match store.create(&title, &description) {
            Ok(task) => {
                println!("Added task #{}", task.sequence_number);
                print_task(&task);
            }
            Err(e) if e.field == TaskField::SequenceNumber => return Err(eyre::Report::new(e)),
            Err(e) => {
                return Err(eyre::Report::new(e).wrap_err("Please fill in both title and description!"));
            }
        },
        Commands::Toggle { sno } => {
            store.toggle_complete(sno);
            match store.get(sno) {
                Some(task) if task.completed => println!("Task #{} marked {}", sno, "completed".green()),
                Some(_) => println!("Task #{} marked {}", sno, "pending".yellow()),
                None => println!("No task #{}", sno),
            }
        }
        Commands::Delete { sno } => match store.get(sno).cloned() {
            Some(task) => {
                store.delete(sno);
                println!("Deleted task #{}: {}", sno, task.title);
            }
            None => println!("No task #{}", sno),
        },
        Commands::List { filter } => {
            store.set_filter(filter);
            print_list(&store);
        }
        Commands::Stats => print_stats(&store),
    }

    Ok(())
}

fn print_list(store: &Store) {
    let now = store.clock().now().with_timezone(&Local);
    println!("{}", format!("My Tasks  {}", now.format("%Y-%m-%d • %H:%M")).bold());
    println!();

    let counts = store.counts();
    let tabs: Vec<String> = Filter::ALL
        .iter()
        .map(|f| {
            let count = match f {
                Filter::All => counts.total,
                Filter::Completed => counts.completed,
                Filter::Pending => counts.pending,
            };
            let label = format!("{} ({})", f, count);
            if *f == store.filter() {
                label.bold().underline().to_string()
            } else {
                label.dimmed().to_string()
            }
        })
        .collect();
    println!("{}", tabs.join("  "));
    println!();

    let view = store.filtered_view();
    if view.is_empty() {
        println!("{}", store.filter().empty_message().italic());
        return;
    }

    for task in view {
        print_task(task);
    }
}

fn print_task(task: &Task) {
    let mark = if task.completed {
        "[x]".green()
    } else {
        "[ ]".yellow()
    };
    let title = if task.completed {
        task.title.strikethrough().dimmed()
    } else {
        task.title.bold()
    };

    println!("{} #{} {}", mark, task.sequence_number, title);
    println!("      {}", task.description);
    println!("      {}", format_created(task.created_at).dimmed());
}

fn print_stats(store: &Store) {
    let counts = store.counts();
    println!("Total:     {}", counts.total);
    println!("Completed: {}", counts.completed.to_string().green());
    println!("Pending:   {}", counts.pending.to_string().yellow());

    if let Some(percent) = counts.completion_percent() {
        println!();
        println!(
            "Progress:  {}%  ({} of {} tasks completed)",
            percent, counts.completed, counts.total
        );
    }
}

fn format_created(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
