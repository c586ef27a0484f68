use clap::{ArgAction, Parser, Subcommand};
use course_unlock::cache::ParseCache;
use course_unlock::catalog::{CatalogBuild, build_catalog};
use course_unlock::config::{self, EngineConfig};
use course_unlock::progress::JsonFileStore;
use course_unlock::source::FsDocumentSource;
use course_unlock::tracker::ProgressTracker;
use course_unlock::{gating, output, stats};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "course-unlock")]
#[command(version)]
#[command(about = "Parse course documents and track progressive unlocks")]
#[command(long_about = "\
Parse course documents and track progressive unlocks

Each document is one course: a front-matter block followed by markdown whose
headings define the structure.

  ---
  id: pr1
  title: Stabilize
  gateway: 1                 # course ladder rung, 1-5
  ---
  # Stabilize                # course title
  ## Part 1: Foundations     # chapter, grouped by part
  ### Welcome                # slide
  Slide text...

Courses unlock one gateway at a time. The 30-day program unlocks one day at a
time. Progress is kept per learner in a JSON store.

Run 'course-unlock gen-config' to generate a documented config.toml.")]
struct Cli {
    /// Content directory holding course documents and config.toml
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Progress store file (overrides progress.store_path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Parse cache file; unchanged documents are not re-parsed
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Include unpublished courses
    #[arg(long, global = true)]
    preview: bool,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the catalog and print the course tree
    Scan,
    /// Report parse failures and structural warnings
    Check,
    /// Print one course's chapters and slides
    Show {
        /// Course id
        id: String,
    },
    /// Print a learner's day states and program stats
    Progress {
        #[arg(long)]
        learner: String,
    },
    /// Mark a program day complete
    CompleteDay {
        /// Day number, 1-30
        day: u32,
        #[arg(long)]
        learner: String,
    },
    /// Enroll a learner in a course
    Enroll {
        /// Course id
        course: String,
        #[arg(long)]
        learner: String,
    },
    /// Complete one lesson (slide) of an enrolled course
    CompleteLesson {
        /// Course id
        course: String,
        /// Lesson id, e.g. 1.2
        lesson: String,
        #[arg(long)]
        learner: String,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if matches!(cli.command, Command::GenConfig) {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.source)?;
    init_thread_pool(&config.processing);

    match &cli.command {
        Command::Scan => {
            let build = load_catalog(&cli, &config, cli.preview)?;
            output::print_scan_output(&build);
        }
        Command::Check => {
            let build = load_catalog(&cli, &config, true)?;
            output::print_check_output(&build);
            if !build.failures.is_empty() {
                return Err(format!("{} document(s) failed to parse", build.failures.len()).into());
            }
        }
        Command::Show { id } => {
            let build = load_catalog(&cli, &config, cli.preview)?;
            let course = build
                .catalog
                .get_course_content(id)
                .ok_or_else(|| format!("no course with id {id}"))?;
            output::print_course(course);
        }
        Command::Progress { learner } => {
            let tracker = open_tracker(&cli, &config).await?;
            let snapshot = tracker.snapshot(learner).await?;
            let today = tracker.today();
            let offset = tracker.offset();
            output::print_progress(
                learner,
                &gating::day_states(&snapshot),
                &stats::get_progress_stats(&snapshot, today, offset),
                stats::calculate_streak(&snapshot, today, offset),
                stats::longest_streak(&snapshot, offset),
            );
        }
        Command::CompleteDay { day, learner } => {
            let tracker = open_tracker(&cli, &config).await?;
            tracker.start_program(learner).await?;
            let outcome = tracker.mark_day_complete(learner, *day).await?;
            println!("{}", output::format_mark_outcome(*day, &outcome));
        }
        Command::Enroll { course, learner } => {
            let build = load_catalog(&cli, &config, cli.preview)?;
            let tracker = open_tracker(&cli, &config).await?;
            let outcome = tracker.enroll(learner, &build.catalog, course).await?;
            println!("{}", output::format_enroll_outcome(course, &outcome));
        }
        Command::CompleteLesson {
            course,
            lesson,
            learner,
        } => {
            let build = load_catalog(&cli, &config, cli.preview)?;
            let tracker = open_tracker(&cli, &config).await?;
            let outcome = tracker
                .complete_lesson(learner, &build.catalog, course, lesson)
                .await?;
            println!("{}", output::format_lesson_outcome(course, lesson, &outcome));
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins over `-v` when set.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can only constrain down.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn load_catalog(
    cli: &Cli,
    config: &EngineConfig,
    preview: bool,
) -> Result<CatalogBuild, Box<dyn Error>> {
    let source = FsDocumentSource::new(&cli.source, &config.catalog.extensions);
    let mut options = config.catalog_options();
    options.include_unpublished |= preview;

    let Some(cache_path) = cli.cache.as_deref() else {
        return Ok(build_catalog(&source, options, None)?);
    };
    let mut cache = ParseCache::load(cache_path);
    let build = build_catalog(&source, options, Some(&mut cache))?;
    cache.save(cache_path)?;
    Ok(build)
}

async fn open_tracker(
    cli: &Cli,
    config: &EngineConfig,
) -> Result<ProgressTracker<JsonFileStore>, Box<dyn Error>> {
    let path = cli
        .store
        .clone()
        .unwrap_or_else(|| Path::new(&config.progress.store_path).to_path_buf());
    let store = JsonFileStore::open(path).await?;
    Ok(ProgressTracker::new(store).with_utc_offset(config.utc_offset()?))
}
