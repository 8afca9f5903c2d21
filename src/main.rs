mod tui;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use gridseq::audio::{self, OutputPort};
use gridseq::loader::sample_loader;
use gridseq::middle::Middle;
use gridseq::pipeline::config;
use gridseq::{AssetRef, Runner, Sequencer, logging};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let config = config::load_config(&project_dir)?;
    logging::init_logger(Some(&config::log_file_path(&project_dir)?))?;
    log::info!("project {} with {:?}", project_dir.display(), config);

    let audio = audio::start_audio(config.max_voices)?;
    let port = audio.port();
    let assets = load_samples(&project_dir, &port)?;

    let sequencer = Arc::new(Mutex::new(Sequencer::new(port, &config)));
    let mut middle = Middle::new(sequencer.clone(), assets);
    let runner = Runner::spawn(sequencer, config.tick_interval())?;

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let frame_rate = Duration::from_millis(16); // ~60fps
    let mut tui_state = tui::mode::TuiState::default();

    'ui: loop {
        middle.poll();
        let ds = middle.display_state().clone();

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, &tui_state);
        })?;

        for event in tui::input::poll_input(frame_rate, &mut tui_state)? {
            if !middle.handle_input(event) {
                break 'ui;
            }
        }
    }

    // stops the transport and cancels whatever is still sounding
    runner.shutdown();
    drop(term);
    drop(audio);
    log::info!("bye");
    Ok(())
}

// one track per .wav in the project directory, named after the file stem
fn load_samples(project_dir: &Path, port: &OutputPort) -> anyhow::Result<Vec<(String, AssetRef)>> {
    let paths = sample_loader::index_wav_in_dir(project_dir)
        .with_context(|| format!("cannot index samples in {}", project_dir.display()))?;
    let mut assets = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match sample_loader::load_and_register(&path, port) {
            Ok(asset) => assets.push((name.to_string(), asset)),
            Err(e) => log::warn!("skipping {}: {e:#}", path.display()),
        }
    }
    log::info!("{} sample(s) loaded", assets.len());
    Ok(assets)
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
