//! pdf-audio - Convert PDF books into chaptered audiobooks using eSpeak

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_audiobook::PipelineError;
use pdf_audiobook::audio::FfmpegToolkit;
use pdf_audiobook::chapters::{ChapterStrategy, MatchMode, Resolution, ScanRange};
use pdf_audiobook::config::PdfAudioConfig;
use pdf_audiobook::document::{PageSource, PopplerDocument};
use pdf_audiobook::pipeline::{OutputLayout, PipelineObserver, PipelineOptions, run_pipeline};
use pdf_audiobook::playback::{BookmarkLog, FfplaySink, Player, SegmentCatalog};
use pdf_audiobook::synthesis::SynthesisProgress;
use pdf_audiobook::tools::ToolPaths;
use pdf_audiobook::tts::EspeakSynthesizer;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

const DEFAULT_PAGES_PER_CHAPTER: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "pdf-audio")]
#[command(about = "Convert PDF books into chaptered audiobooks using eSpeak", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the PDF file
    pdf_file: Option<PathBuf>,

    /// First page of the printed table of contents (1-based)
    #[arg(long)]
    toc_start_page: Option<usize>,

    /// Last page of the printed table of contents (1-based)
    #[arg(long)]
    toc_end_page: Option<usize>,

    /// First page of the body text (1-based)
    #[arg(long)]
    content_start_page: Option<usize>,

    /// Folder for text files, audio files and the audiobook
    #[arg(short, long)]
    output_folder: Option<PathBuf>,

    /// eSpeak voice code (e.g. "en", "en-us")
    #[arg(long)]
    voice: Option<String>,

    /// Speech rate in words per minute (80-450)
    #[arg(long)]
    rate: Option<u32>,

    /// Volume (0-200)
    #[arg(long)]
    volume: Option<u32>,

    /// How chapters are found
    #[arg(long, value_enum, default_value_t = StrategyArg::Auto)]
    strategy: StrategyArg,

    /// Pages per chapter for the fixed strategy
    #[arg(long, default_value_t = DEFAULT_PAGES_PER_CHAPTER)]
    pages_per_chapter: usize,

    /// How chapter titles are matched against page text
    #[arg(long, value_enum, default_value_t = MatchModeArg::Exact)]
    match_mode: MatchModeArg,

    /// Audiobook title (default: PDF file name)
    #[arg(long)]
    title: Option<String>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Embedded table of contents, falling back to a page scan
    Auto,
    /// Scan body pages for titles listed on the contents pages
    Scan,
    /// Split into chapters of a fixed page count
    Fixed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum MatchModeArg {
    /// Title must appear verbatim
    Exact,
    /// Differences in spacing and line breaks are ignored
    Whitespace,
}

impl From<MatchModeArg> for MatchMode {
    fn from(arg: MatchModeArg) -> Self {
        match arg {
            MatchModeArg::Exact => MatchMode::Exact,
            MatchModeArg::Whitespace => MatchMode::Whitespace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Play a converted audiobook chapter by chapter
    Listen {
        /// Chapter to start with
        #[arg(long, default_value_t = 1)]
        chapter: usize,
    },
    /// List saved bookmarks
    Bookmarks,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default voice
    SetVoice {
        /// eSpeak voice code
        voice: String,
    },
    /// Set default speech rate
    SetRate {
        /// Words per minute (80-450)
        value: u32,
    },
    /// Set default volume
    SetVolume {
        /// Value (0-200)
        value: u32,
    },
    /// Set default output folder
    SetOutput {
        /// Folder path
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match &args.command {
        Some(Commands::Config { action }) => return handle_config_command(action),
        Some(Commands::Listen { chapter }) => {
            let config = PdfAudioConfig::load().context("Failed to load configuration")?;
            let output_folder = args.output_folder.clone().unwrap_or(config.output_folder);
            return listen(&output_folder, &config.tools, *chapter);
        }
        Some(Commands::Bookmarks) => {
            let config = PdfAudioConfig::load().context("Failed to load configuration")?;
            let output_folder = args.output_folder.clone().unwrap_or(config.output_folder);
            return list_bookmarks(&output_folder);
        }
        None => {}
    }

    let pdf_path = args
        .pdf_file
        .clone()
        .ok_or_else(|| anyhow::anyhow!("PDF file path is required. Run 'pdf-audio --help' for usage."))?;

    if !pdf_path.exists() {
        anyhow::bail!("PDF file not found: {}", pdf_path.display());
    }

    let config = PdfAudioConfig::load().context("Failed to load configuration")?;
    let options = pipeline_options(&args, &config, &pdf_path)?;
    let layout = OutputLayout::new(args.output_folder.clone().unwrap_or(config.output_folder.clone()));

    log::debug!("PDF: {}", pdf_path.display());
    log::debug!("Output: {}", layout.root().display());
    log::debug!("Options: {:?}", options);

    let synthesizer = EspeakSynthesizer::new(&config.tools);
    if !synthesizer.is_available() {
        anyhow::bail!("espeak not found. Install espeak or set tools.espeak in the config file.");
    }
    let toolkit = FfmpegToolkit::new(&config.tools);
    if !toolkit.is_available() {
        anyhow::bail!("ffmpeg/ffprobe not found. Install ffmpeg or set tools.ffmpeg in the config file.");
    }

    eprintln!("Opening PDF: {}", pdf_path.display());
    let document = PopplerDocument::open(&pdf_path, &config.tools).map_err(stage_error)?;
    eprintln!("Pages: {} ({})", document.page_count(), document.path().display());

    let mut progress = CliProgress::default();
    let record = run_pipeline(
        &document,
        &pdf_path,
        &layout,
        &options,
        &synthesizer,
        &toolkit,
        &mut progress,
    )
    .map_err(stage_error)?;

    eprintln!(
        "\nChapters: {}, Converted: {}, Failed: {}",
        record.chapters,
        record.synthesized,
        record.failed.len()
    );
    for failure in &record.failed {
        eprintln!("  Chapter {} '{}': {}", failure.index, failure.title, failure.error);
    }
    for chapter in &record.audiobook.chapters {
        log::debug!(
            "  {:3}. {} [{}]",
            chapter.index,
            chapter.title,
            format_duration(chapter.duration_ms())
        );
    }
    eprintln!(
        "Output: {} ({})",
        record.audiobook.path.display(),
        format_duration(record.audiobook.total_duration_ms())
    );

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Name the failing stage in the top-level error.
fn stage_error(e: PipelineError) -> anyhow::Error {
    let stage = e.stage();
    anyhow::Error::new(e).context(format!("Conversion failed during {}", stage))
}

fn pipeline_options(args: &Args, config: &PdfAudioConfig, pdf_path: &Path) -> Result<PipelineOptions> {
    let strategy = match args.strategy {
        StrategyArg::Auto => ChapterStrategy::Auto,
        StrategyArg::Scan => ChapterStrategy::Scan,
        StrategyArg::Fixed => {
            if args.pages_per_chapter == 0 {
                anyhow::bail!("--pages-per-chapter must be at least 1");
            }
            ChapterStrategy::FixedPages(args.pages_per_chapter)
        }
    };

    let toc_start = args.toc_start_page.unwrap_or(config.toc_start_page);
    let toc_end = args.toc_end_page.unwrap_or(config.toc_end_page);
    let content_start = args.content_start_page.unwrap_or(config.content_start_page);
    if toc_start == 0 || toc_end < toc_start || content_start == 0 {
        anyhow::bail!(
            "Invalid page range: TOC {}-{}, content from {} (pages are numbered from 1)",
            toc_start,
            toc_end,
            content_start
        );
    }

    let mut synthesis = config.synthesis_options();
    if let Some(voice) = &args.voice {
        synthesis = synthesis.with_voice(voice.as_str());
    }
    if let Some(rate) = args.rate {
        synthesis = synthesis.with_rate(rate);
    }
    if let Some(volume) = args.volume {
        synthesis = synthesis.with_volume(volume);
    }

    let title = args.title.clone().unwrap_or_else(|| {
        pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Audiobook".to_string())
    });

    Ok(PipelineOptions {
        strategy,
        scan_range: ScanRange::from_page_numbers(toc_start, toc_end, content_start),
        match_mode: args.match_mode.into(),
        synthesis,
        title,
    })
}

/// Progress bars for the page scan and the synthesis batch.
#[derive(Default)]
struct CliProgress {
    scan: Option<ProgressBar>,
    synthesis: Option<ProgressBar>,
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

impl PipelineObserver for CliProgress {
    fn page_scanned(&mut self, scanned: usize, total: usize) {
        let pb = self.scan.get_or_insert_with(|| {
            let pb = progress_bar(total);
            pb.set_message("Scanning pages");
            pb
        });
        pb.set_position(scanned as u64);
    }

    fn chapters_resolved(&mut self, resolution: &Resolution) {
        if let Some(pb) = self.scan.take() {
            pb.finish_and_clear();
        }
        eprintln!(
            "Found {} chapters ({})",
            resolution.boundaries.len(),
            resolution.method
        );
        for (i, boundary) in resolution.boundaries.iter().enumerate() {
            log::debug!(
                "  {:3}. {} (pages {}-{}, {} pages)",
                i + 1,
                boundary.title,
                boundary.start_page + 1,
                boundary.end_page + 1,
                boundary.page_len()
            );
        }
    }

    fn chapter_synthesized(&mut self, progress: &SynthesisProgress) {
        let pb = self
            .synthesis
            .get_or_insert_with(|| progress_bar(progress.total));
        pb.set_position(progress.completed as u64);
        pb.set_message(progress.title.clone());
        if progress.completed == progress.total {
            pb.finish_with_message("Synthesis complete");
        }
    }
}

fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn listen(output_folder: &Path, tools: &ToolPaths, chapter: usize) -> Result<()> {
    let layout = OutputLayout::new(output_folder);
    let catalog = SegmentCatalog::open(&layout.audio_dir(), &layout.manifest_path())
        .context("Failed to index chapter audio")?;

    if catalog.chapter_count() == 0 {
        anyhow::bail!(
            "No chapter audio found in {}. Convert a PDF first.",
            layout.audio_dir().display()
        );
    }

    eprintln!("{} chapters available.", catalog.chapter_count());
    eprintln!("Commands: play [N], pause, resume, next, bookmark, status, quit");

    let bookmarks = BookmarkLog::new(layout.bookmarks_path());
    let mut player = Player::new(FfplaySink::new(tools), catalog, bookmarks);

    if let Err(e) = player.play(chapter) {
        eprintln!("Error: {}", e);
    }
    print_status(&player);

    for line in io::stdin().lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        player.poll();

        let outcome = match words.next() {
            None => continue,
            Some("play") => match words.next().map(str::parse::<usize>) {
                None => player.play(player.state().current_chapter),
                Some(Ok(n)) => player.play(n),
                Some(Err(_)) => {
                    eprintln!("Usage: play [chapter number]");
                    continue;
                }
            },
            Some("pause") => player.pause(),
            Some("resume") => player.resume(),
            Some("next") => player.next_chapter(),
            Some("bookmark") => player.add_bookmark().map(|b| {
                eprintln!("Bookmarked chapter {}", b.chapter_index);
            }),
            Some("status") => Ok(()),
            Some("quit") | Some("q") | Some("exit") => break,
            Some(other) => {
                eprintln!("Unknown command '{}'", other);
                continue;
            }
        };

        if let Err(e) = outcome {
            eprintln!("Error: {}", e);
        }
        player.poll();
        print_status(&player);
    }

    player.stop()?;
    Ok(())
}

fn print_status(player: &Player<FfplaySink>) {
    let state = player.state();
    eprintln!(
        "Chapter {}/{} [{:?}] {}",
        state.current_chapter,
        player.catalog().chapter_count(),
        state.status,
        format_duration(player.sink().position().as_millis() as u64)
    );
}

fn list_bookmarks(output_folder: &Path) -> Result<()> {
    let layout = OutputLayout::new(output_folder);
    let log = BookmarkLog::new(layout.bookmarks_path());
    let bookmarks = log.entries().context("Failed to read bookmarks")?;

    if bookmarks.is_empty() {
        println!("No bookmarks in {}", log.path().display());
        return Ok(());
    }

    for bookmark in bookmarks {
        println!(
            "Chapter {:3}  {}",
            bookmark.chapter_index,
            bookmark.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = PdfAudioConfig::load()?;
            println!("Configuration file: {:?}", PdfAudioConfig::config_path()?);
            println!();
            println!("voice = \"{}\"", config.voice);
            println!("rate = {}", config.rate);
            println!("volume = {}", config.volume);
            println!("output_folder = \"{}\"", config.output_folder.display());
            println!("toc_start_page = {}", config.toc_start_page);
            println!("toc_end_page = {}", config.toc_end_page);
            println!("content_start_page = {}", config.content_start_page);
            for (name, path) in [
                ("espeak", &config.tools.espeak),
                ("ffmpeg", &config.tools.ffmpeg),
                ("ffprobe", &config.tools.ffprobe),
                ("ffplay", &config.tools.ffplay),
                ("poppler_dir", &config.tools.poppler_dir),
            ] {
                match path {
                    Some(path) => println!("tools.{} = \"{}\"", name, path.display()),
                    None => println!("tools.{} = (PATH)", name),
                }
            }
        }
        ConfigAction::SetVoice { voice } => {
            let mut config = PdfAudioConfig::load()?;
            config.voice = voice.clone();
            config.save()?;
            println!("Default voice set to: {}", voice);
        }
        ConfigAction::SetRate { value } => {
            let mut config = PdfAudioConfig::load()?;
            config.rate = (*value).clamp(80, 450);
            config.save()?;
            println!("Default rate set to: {}", config.rate);
        }
        ConfigAction::SetVolume { value } => {
            let mut config = PdfAudioConfig::load()?;
            config.volume = (*value).min(200);
            config.save()?;
            println!("Default volume set to: {}", config.volume);
        }
        ConfigAction::SetOutput { path } => {
            let mut config = PdfAudioConfig::load()?;
            config.output_folder = path.clone();
            config.save()?;
            println!("Default output folder set to: {}", path.display());
        }
    }
    Ok(())
}
