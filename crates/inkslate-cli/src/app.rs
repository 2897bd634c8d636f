//! Command implementations for the `inkslate` binary.

use crate::script::{self, ScriptAction, ScriptEvent};
use anyhow::{Context, Result};
use inkslate_core::document::Document;
use inkslate_core::options::Options;
use inkslate_core::session::{Session, SessionEvent};
use inkslate_core::serializer::SessionData;
use inkslate_core::shortcuts::HistoryKeymap;
use inkslate_core::surface::RasterSurface;
use inkslate_render::{
    ImageCrateDecoder, LogRenderer, PngRenderer, SvgRenderer, VelloCpuSurface, export_svg,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use uuid::Uuid;

/// Surface and output settings shared by every command.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub width: u32,
    pub height: u32,
    /// JSON options file; defaults apply when absent.
    pub options: Option<PathBuf>,
    pub session_out: Option<PathBuf>,
    pub png_out: Option<PathBuf>,
    pub svg_out: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            options: None,
            session_out: None,
            png_out: None,
            svg_out: None,
        }
    }
}

/// One drawing document backed by CPU surfaces.
pub struct App {
    config: AppConfig,
    document: Document<VelloCpuSurface>,
    session: Uuid,
}

impl App {
    /// Create the document with a single focused session.
    ///
    /// Relative image paths resolve against `asset_dir`.
    pub fn new(config: AppConfig, asset_dir: Option<&Path>) -> Result<Self> {
        let options = load_options(config.options.as_deref())?;
        let surface = VelloCpuSurface::new(config.width, config.height)?;
        let decoder = match asset_dir {
            Some(dir) => ImageCrateDecoder::with_base_dir(dir),
            None => ImageCrateDecoder::new(),
        };
        let session = Session::with_decoder(surface, options, Rc::new(decoder))?;

        let mut document = Document::new();
        let session = document.add_session(session);
        Ok(Self {
            config,
            document,
            session,
        })
    }

    fn session_mut(&mut self) -> Result<&mut Session<VelloCpuSurface>> {
        self.document
            .session_mut(self.session)
            .context("Session was removed from the document")
    }

    /// Feed a recorded script through the document, settling after each event.
    pub fn record(&mut self, script_path: &Path) -> Result<()> {
        let file = File::open(script_path)
            .with_context(|| format!("Failed to open {}", script_path.display()))?;
        let events = script::parse(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", script_path.display()))?;

        for event in &events {
            self.apply(event)?;
            let session = self.session_mut()?;
            pollster::block_on(session.settle());
            for event in session.drain_events() {
                log_event(event);
            }
        }
        log::info!(
            "Recorded {} strokes from {} events",
            self.session_mut()?.strokes().len(),
            events.len()
        );
        Ok(())
    }

    fn apply(&mut self, event: &ScriptEvent) -> Result<()> {
        match event {
            ScriptEvent::Pointer(pointer) => {
                self.session_mut()?.handle_pointer_event(pointer);
            }
            ScriptEvent::Key(key) => match self.document.handle_key(key) {
                Some(Err(e)) => log::warn!("Key {:?} rejected: {}", key.key, e),
                Some(Ok((action, moved))) => log::debug!("{:?} (moved: {})", action, moved),
                None => log::trace!("Unbound key {:?}", key.key),
            },
            ScriptEvent::Action { action } => {
                let session = self.session_mut()?;
                match action {
                    ScriptAction::Clear => session.clear(),
                    ScriptAction::Save => session.save(),
                    ScriptAction::Reset => session.reset_history(),
                    ScriptAction::Undo => {
                        if let Err(e) = session.undo() {
                            log::warn!("Undo rejected: {}", e);
                        }
                    }
                    ScriptAction::Redo => {
                        if let Err(e) = session.redo() {
                            log::warn!("Redo rejected: {}", e);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Load a saved session onto the surface.
    pub fn load(&mut self, session_path: &Path) -> Result<()> {
        let json = std::fs::read_to_string(session_path)
            .with_context(|| format!("Failed to read {}", session_path.display()))?;
        let session = self.session_mut()?;
        session
            .load_json(&json)
            .with_context(|| format!("Invalid session file {}", session_path.display()))?;
        pollster::block_on(session.settle());
        Ok(())
    }

    /// Replay the strokes one segment per frame, writing a PNG for each.
    pub fn write_animation_frames(&mut self, dir: &Path) -> Result<usize> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let session = self.session_mut()?;
        let log = session.log().clone();
        session.sketch_mut().clear();
        let mut animation = session.animate();
        let mut written = 0;
        while session.step_animation(&mut animation) {
            let png = session.sketch_mut().surface_mut().snapshot().encode_png()?;
            let path = dir.join(format!("frame-{:05}.png", written));
            std::fs::write(&path, png)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += 1;
        }
        // Leave the surface and log as they were before the replay.
        session.sketch_mut().clear();
        session.sketch_mut().load(log);
        pollster::block_on(session.settle());
        log::info!("Wrote {} animation frames to {}", written, dir.display());
        Ok(written)
    }

    /// Write every output named in the config.
    pub fn write_outputs(&mut self) -> Result<()> {
        let AppConfig {
            session_out,
            png_out,
            svg_out,
            ..
        } = self.config.clone();
        let session = self.session_mut()?;
        pollster::block_on(session.settle());

        if let Some(path) = session_out {
            let json = session.to_json()?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote session to {}", path.display());
        }
        if let Some(path) = png_out {
            let png = session.sketch_mut().surface_mut().snapshot().encode_png()?;
            std::fs::write(&path, png)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote PNG to {}", path.display());
        }
        if let Some(path) = svg_out {
            let svg = pollster::block_on(export_svg(session))?;
            std::fs::write(&path, svg)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote SVG to {}", path.display());
        }
        Ok(())
    }

    pub fn session(&self) -> Option<&Session<VelloCpuSurface>> {
        self.document.session(self.session)
    }
}

/// Render a saved session's command log straight to files, without a live session.
pub fn render_file(session_path: &Path, config: &AppConfig) -> Result<()> {
    let json = std::fs::read_to_string(session_path)
        .with_context(|| format!("Failed to read {}", session_path.display()))?;
    let data = SessionData::from_json(&json)
        .with_context(|| format!("Invalid session file {}", session_path.display()))?;

    if let Some(path) = &config.png_out {
        let decoder = match session_path.parent() {
            Some(dir) => ImageCrateDecoder::with_base_dir(dir),
            None => ImageCrateDecoder::new(),
        };
        let png = PngRenderer::with_decoder(config.width, config.height, Rc::new(decoder))
            .render(&data.actions)?;
        std::fs::write(path, png).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote PNG to {}", path.display());
    }
    if let Some(path) = &config.svg_out {
        let svg = SvgRenderer::new(config.width, config.height).render(&data.actions)?;
        std::fs::write(path, svg).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote SVG to {}", path.display());
    }
    Ok(())
}

fn load_options(path: Option<&Path>) -> Result<Options> {
    let Some(path) = path else {
        return Ok(Options::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read options {}", path.display()))?;
    Options::from_json(&json).with_context(|| format!("Invalid options file {}", path.display()))
}

fn log_event(event: SessionEvent) {
    match event {
        SessionEvent::PointerMove { .. } => log::trace!("{:?}", event),
        _ => log::debug!("{:?}", event),
    }
}

/// Print the history key bindings.
pub fn print_shortcuts() {
    println!("\n=== Keyboard Shortcuts ===");
    for shortcut in HistoryKeymap::default().shortcuts() {
        println!("  {:20} {}", shortcut.format(), shortcut.description);
    }
    println!("  (Ctrl also matches Cmd on macOS)");
    println!();
}
