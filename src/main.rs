use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use ica_bands::decomposer::check_component_count;
use ica_bands::{
    BandSelectionPipeline, HyperCube, SelectionConfig, SelectionReport, SpectralMatrix, Tolerance,
};

#[derive(Parser, Debug)]
#[command(
    name = "ica-bands",
    about = "Select informative bands of a hyperspectral cube with ICA"
)]
struct Cli {
    /// ENVI header (.hdr) of the cube
    header: PathBuf,

    /// Raw data file; defaults to the header path without `.hdr`
    #[arg(long)]
    data: Option<PathBuf>,

    /// Number of independent components (prompted for when omitted)
    #[arg(short = 'c', long)]
    components: Option<usize>,

    /// Number of bands to select (prompted for when omitted)
    #[arg(short = 'b', long)]
    bands: Option<usize>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the initial unmixing matrix
    #[arg(long)]
    seed: Option<u64>,

    /// FastICA iteration bound
    #[arg(long)]
    max_iter: Option<usize>,

    /// FastICA convergence tolerance
    #[arg(long)]
    tol: Option<f64>,

    /// Check X ≈ S·Aᵗ + mean after decomposition
    #[arg(long)]
    check_reconstruction: bool,

    /// Absolute tolerance of the reconstruction check
    #[arg(long, requires = "check_reconstruction")]
    atol: Option<f64>,

    /// Relative tolerance of the reconstruction check
    #[arg(long, requires = "check_reconstruction")]
    rtol: Option<f64>,
}

impl Cli {
    fn selection_config(&self) -> Result<SelectionConfig> {
        let mut cfg = match &self.config {
            Some(path) => SelectionConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => SelectionConfig::default(),
        };

        if let Some(seed) = self.seed {
            cfg.ica.seed = seed;
        }
        if let Some(max_iter) = self.max_iter {
            cfg.ica.max_iter = max_iter;
        }
        if let Some(tol) = self.tol {
            cfg.ica.tol = tol;
        }
        if self.check_reconstruction {
            let base = cfg
                .reconstruction_check
                .unwrap_or_else(Tolerance::reconstruction);
            cfg.reconstruction_check = Some(Tolerance::new(
                self.atol.unwrap_or(base.atol),
                self.rtol.unwrap_or(base.rtol),
            ));
        }
        Ok(cfg)
    }
}

fn prompt_usize(question: &str) -> Result<usize> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "{} ", question)?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            bail!("no answer to '{}'", question);
        }
        match line.trim().parse::<usize>() {
            Ok(n) => return Ok(n),
            Err(_) => eprintln!("please enter a non-negative integer"),
        }
    }
}

fn print_report(report: &SelectionReport, wavelengths: Option<&[f64]>) {
    println!("Band number with the highest scores (best first):");
    for band in report.descending() {
        let score = report.score_of(band).unwrap_or(f64::NAN);
        match wavelengths.and_then(|w| w.get(band - 1)) {
            Some(wl) => println!("  band {:>4}  λ={:>10.3}  score={:.6e}", band, wl, score),
            None => println!("  band {:>4}  score={:.6e}", band, score),
        }
    }
    for diag in &report.diagnostics {
        println!("  warning: {}", diag);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.selection_config()?;

    let cube = HyperCube::open(&cli.header, cli.data.as_deref())
        .with_context(|| format!("opening cube {}", cli.header.display()))?;
    let wavelengths = cube.wavelengths.clone();
    // the cube is dropped once its values are copied into the matrix
    let x = SpectralMatrix::from_cube(cube)?;
    info!("Spectral matrix: {} × {}", x.n_pixels(), x.n_bands());

    let n_components = match cli.components {
        Some(n) => n,
        None => prompt_usize("What is the number of components?")?,
    };
    check_component_count(n_components, x.n_bands())?;

    let n_bands = match cli.bands {
        Some(n) => n,
        None => prompt_usize("How many bands do you want to select?")?,
    };

    let pipeline = BandSelectionPipeline::new(config);
    let report = pipeline.run(&x, n_components, n_bands)?;

    print_report(&report, wavelengths.as_deref());
    Ok(())
}
