//! Running an external simulator on a deck

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::config::{Dialect, RawFormat, SimConfig};
use crate::emit::NetlistDeck;
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Files Xyce names after the deck, next to the raw file
pub const COMPANION_SUFFIXES: [&str; 6] =
    [".NOISE.prn", ".four0", ".four", ".SENS.prn", ".HB.FD.prn", ".HB.TD.prn"];

/// Splits a byte stream into lines; a partial last line is carried over to
/// the next chunk
#[derive(Debug, Default)]
pub struct LineDecoder {
    carry: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete lines in `chunk` (plus whatever was carried over)
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.carry.drain(..=pos).collect();
            lines.push(decode_line(&line));
        }
        lines
    }

    /// The unterminated last line, if any
    pub fn finish(self) -> Option<String> {
        if self.carry.is_empty() {
            None
        } else {
            Some(decode_line(&self.carry))
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

/// Drain one child pipe on its own thread, logging each line
fn spawn_reader<R: Read + Send + 'static>(mut pipe: R, label: &'static str) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut decoder = LineDecoder::new();
        let mut text = String::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    log::debug!("{label}: read failed: {e}");
                    break;
                }
            };
            for line in decoder.feed(&buf[..n]) {
                log::debug!("{label}: {line}");
                text.push_str(&line);
                text.push('\n');
            }
        }
        if let Some(line) = decoder.finish() {
            log::debug!("{label}: {line}");
            text.push_str(&line);
            text.push('\n');
        }
        text
    })
}

/// Files and captured output of one finished simulator run
#[derive(Debug)]
pub struct SimulationRun {
    pub dialect: Dialect,
    pub workdir: PathBuf,
    pub deck: PathBuf,
    /// Raw waveform file (SPICE simulators), if one was written
    pub raw: Option<PathBuf>,
    /// Dataset file (Qucsator), if one was written
    pub dataset: Option<PathBuf>,
    /// Captured standard output
    pub log: String,
    pub stderr: String,
    // Keeps a temporary working directory alive as long as the run
    _tempdir: Option<TempDir>,
}

impl SimulationRun {
    /// A finished run kept in `workdir`, such as one started with a
    /// configured working directory; `log` is its captured output
    pub fn from_workdir(dialect: Dialect, workdir: impl Into<PathBuf>, log: String) -> Self {
        let workdir = workdir.into();
        let (deck_name, output_name) = file_names(dialect);
        let output = Some(workdir.join(output_name)).filter(|p| p.is_file());
        let (raw, dataset) = match dialect {
            Dialect::QucsatorNative => (None, output),
            _ => (output, None),
        };
        Self {
            dialect,
            deck: workdir.join(deck_name),
            workdir,
            raw,
            dataset,
            log,
            stderr: String::new(),
            _tempdir: None,
        }
    }

    /// Output file the simulator names after the deck, such as Xyce's
    /// `<deck>.NOISE.prn`
    pub fn companion(&self, suffix: &str) -> Option<PathBuf> {
        let mut name = self.deck.file_name()?.to_os_string();
        name.push(suffix);
        let path = self.workdir.join(name);
        path.is_file().then_some(path)
    }
}

/// Deck and output file names inside the working directory
fn file_names(dialect: Dialect) -> (&'static str, &'static str) {
    match dialect {
        Dialect::QucsatorNative => ("simdeck.net", "simdeck.dat"),
        _ => ("simdeck.cir", "simdeck.raw"),
    }
}

/// Starts simulators as configured
pub struct Launcher<'a> {
    config: &'a SimConfig,
}

impl<'a> Launcher<'a> {
    pub fn new(config: &'a SimConfig) -> Self {
        Self { config }
    }

    fn program_name(&self) -> Result<&'a str> {
        self.config.executable().ok_or_else(|| Error::ProcessLaunch {
            program: self.config.dialect.to_string(),
            reason: format!("{} decks cannot be simulated", self.config.dialect),
        })
    }

    /// Locate the simulator executable
    pub fn discover(&self) -> Result<PathBuf> {
        let program = self.program_name()?;
        which::which(program).map_err(|e| Error::ProcessLaunch {
            program: program.to_string(),
            reason: e.to_string(),
        })
    }

    /// Arguments for one run: `deck` in, `output` (raw file or dataset) out
    pub fn arguments(&self, deck: &Path, output: &Path) -> Vec<String> {
        let deck = deck.display().to_string();
        let output = output.display().to_string();
        match self.config.dialect {
            Dialect::Ngspice => vec!["-b".into(), "-r".into(), output, deck],
            Dialect::Xyce => {
                let mut args = vec!["-r".into(), output];
                if self.config.raw_format == RawFormat::Ascii {
                    args.push("-a".into());
                }
                args.push(deck);
                args
            }
            Dialect::SpiceOpus => vec!["-b".into(), "-c".into(), deck],
            Dialect::QucsatorNative => vec!["-i".into(), deck, "-o".into(), output],
            Dialect::Cdl | Dialect::VerilogA => Vec::new(),
        }
    }

    /// Deck text as handed to the simulator.
    ///
    /// SpiceOpus has no raw-file switch, so a control block writing the raw
    /// file is inserted before `.END`.
    fn deck_text(&self, deck: &NetlistDeck, output: &Path) -> String {
        let text = deck.text();
        if self.config.dialect != Dialect::SpiceOpus {
            return text;
        }
        let control = format!(".control\nrun\nwrite {}\nquit\n.endc\n", output.display());
        match text.rfind(".END") {
            Some(pos) => format!("{}{control}{}", &text[..pos], &text[pos..]),
            None => format!("{text}{control}"),
        }
    }

    fn preprocess(&self, deck_path: &Path) -> Result<()> {
        let Some(spec) = &self.config.preprocess else {
            return Ok(());
        };
        log::info!("preprocessing deck with {}", spec.program);
        let output = Command::new(&spec.program)
            .args(&spec.args)
            .arg(deck_path)
            .output()
            .map_err(|e| Error::ProcessLaunch {
                program: spec.program.clone(),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(Error::SimulatorFailed {
                program: spec.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        fs::write(deck_path, &output.stdout)?;
        Ok(())
    }

    /// Write `deck` into the working directory and run the simulator on it
    pub fn run(&self, deck: &NetlistDeck) -> Result<SimulationRun> {
        let program = self.discover()?;
        let program_name = program.display().to_string();

        let (tempdir, workdir) = match &self.config.workdir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                (None, dir.clone())
            }
            None => {
                let dir = tempfile::Builder::new().prefix("simdeck").tempdir()?;
                let path = dir.path().to_path_buf();
                (Some(dir), path)
            }
        };

        let (deck_name, output_name) = file_names(self.config.dialect);
        let deck_path = workdir.join(deck_name);
        let output_path = workdir.join(output_name);
        // Stale output files would be read back as this run's results
        let companions = COMPANION_SUFFIXES.iter().map(|suffix| {
            let mut name = deck_path.as_os_str().to_os_string();
            name.push(suffix);
            PathBuf::from(name)
        });
        for stale in std::iter::once(output_path.clone()).chain(companions) {
            if stale.is_file() {
                log::debug!("removing stale {}", stale.display());
                fs::remove_file(&stale)?;
            }
        }
        fs::write(&deck_path, self.deck_text(deck, &output_path))?;
        self.preprocess(&deck_path)?;

        let args = self.arguments(&deck_path, &output_path);
        log::info!("running {program_name} {}", args.join(" "));

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(&workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::ProcessLaunch {
                program: program_name.clone(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take().map(|p| spawn_reader(p, "stdout"));
        let stderr = child.stderr.take().map(|p| spawn_reader(p, "stderr"));

        let status = self.wait(&mut child, &program_name)?;
        let log = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();

        if !status.success() {
            return Err(Error::SimulatorFailed {
                program: program_name,
                status: status.to_string(),
                stderr,
            });
        }
        log::info!("{program_name} finished ({status})");

        let output = output_path.is_file().then_some(output_path);
        let (raw, dataset) = match self.config.dialect {
            Dialect::QucsatorNative => (None, output),
            _ => (output, None),
        };
        Ok(SimulationRun {
            dialect: self.config.dialect,
            workdir,
            deck: deck_path,
            raw,
            dataset,
            log,
            stderr,
            _tempdir: tempdir,
        })
    }

    /// Wait for the child, killing it once the configured time is up
    fn wait(&self, child: &mut Child, program: &str) -> Result<ExitStatus> {
        let start = Instant::now();
        let limit = Duration::from_secs(self.config.timeout_secs);
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if self.config.timeout_secs > 0 && start.elapsed() > limit {
                log::warn!("{program} exceeded {}s, killing it", self.config.timeout_secs);
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::SimulatorTimeout {
                    program: program.to_string(),
                    secs: self.config.timeout_secs,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
