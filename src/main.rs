use clap::{ArgAction, Parser, Subcommand};
use dview::config::Config;
use dview::error::Result;
use dview::io;
use dview::model::Lattice;
use dview::physics::analysis::defects::find_defects;
use dview::physics::analysis::picker::{pick, Candidates};
use dview::physics::analysis::rdf::compute_rdf;
use dview::physics::operations::fcc::generate_fcc;
use dview::utils::{logger, report};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "dview")]
#[command(about = "Point-defect, cluster and RDF analysis of atomistic simulation cells")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file (default: per-user settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Non-periodic axes, e.g. 'z' or 'xy'
    #[arg(long, global = true, value_parser = parse_free_axes)]
    free: Option<[bool; 3]>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify an input configuration against a reference lattice
    Defects { reference: String, input: String },
    /// Report the defect nearest to a point
    #[command(allow_negative_numbers = true)]
    Pick {
        reference: String,
        input: String,
        x: f64,
        y: f64,
        z: f64,
    },
    /// Radial distribution function of a lattice
    Rdf {
        input: String,
        /// Write the table to this file instead of stdout
        #[arg(long)]
        out: Option<String>,
    },
    /// Generate a block of FCC cells
    Fcc {
        nx: usize,
        ny: usize,
        nz: usize,
        a0: f64,
        symbol: String,
        out: String,
        /// Atom indices to leave out, e.g. '0,17'
        #[arg(long, value_delimiter = ',')]
        remove: Vec<usize>,
    },
}

/// Periodicity flags with the listed axes switched off.
fn parse_free_axes(s: &str) -> std::result::Result<[bool; 3], String> {
    let mut pbc = [true; 3];
    for ch in s.chars() {
        let axis = match ch.to_ascii_lowercase() {
            'x' => 0,
            'y' => 1,
            'z' => 2,
            _ => return Err(format!("unknown axis '{}'", ch)),
        };
        pbc[axis] = false;
    }
    Ok(pbc)
}

impl Cli {
    fn pbc(&self) -> [bool; 3] {
        self.free.unwrap_or([true; 3])
    }
}

fn load_pair(ref_path: &str, in_path: &str, pbc: [bool; 3], cfg: &Config) -> Result<(Lattice, Lattice)> {
    let reference = io::load_lattice(ref_path, pbc)?;
    let mut input = io::load_lattice(in_path, pbc)?;
    input.wrap_atoms(cfg.threads)?;
    log::info!(
        "Reference {} ({}), input {} ({})",
        ref_path,
        report::formula(&reference.species),
        in_path,
        report::formula(&input.species)
    );
    Ok((reference, input))
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = Config::load(cli.config.as_deref())?;
    let pbc = cli.pbc();

    match &cli.command {
        Command::Defects { reference, input } => {
            let (reference, input) = load_pair(reference, input, pbc, &cfg)?;
            let result = find_defects(
                &input.sites(),
                &reference.sites(),
                &reference.cell,
                &cfg.defect_options(),
            )?;
            print!(
                "{}",
                report::defect_summary(&result, &input.species, &reference.species)
            );
        }
        Command::Pick {
            reference,
            input,
            x,
            y,
            z,
        } => {
            let (reference, input) = load_pair(reference, input, pbc, &cfg)?;
            let query = [*x, *y, *z];
            let result = find_defects(
                &input.sites(),
                &reference.sites(),
                &reference.cell,
                &cfg.defect_options(),
            )?;
            let opts = cfg.pick_options();
            let candidates = Candidates::from_defects(
                &result.vacancies,
                &result.interstitials,
                &result.antisites,
                &result.splits,
                &input.sites(),
                &reference.sites(),
                &opts,
            )?;
            match pick(query, &candidates, &reference.cell, &opts)? {
                Some(p) => println!("{:?} {} at {:.4} Å", p.category, p.index, p.distance),
                None => println!("Nothing near {:?}", query),
            }
        }
        Command::Rdf { input, out } => {
            let mut lattice = io::load_lattice(input, pbc)?;
            lattice.wrap_atoms(cfg.threads)?;
            let rdf = compute_rdf(&lattice.sites(), &lattice.cell, &cfg.rdf_options())?;
            let table = report::rdf_table(&rdf);
            match out {
                Some(out) => {
                    std::fs::write(out, table)?;
                    log::info!("RDF written to {}", out);
                }
                None => print!("{}", table),
            }
        }
        Command::Fcc {
            nx,
            ny,
            nz,
            a0,
            symbol,
            out,
            remove,
        } => {
            let mut lattice = generate_fcc(symbol, [*nx, *ny, *nz], *a0, pbc)?;
            let mut remove = remove.clone();
            remove.sort_unstable();
            remove.dedup();
            // highest first so earlier indices stay valid
            for &i in remove.iter().rev() {
                lattice.remove_atom(i)?;
            }
            if !remove.is_empty() {
                log::info!("Removed {} atoms", remove.len());
            }
            io::save_lattice(out, &lattice)?;
            print!("{}", report::lattice_summary(&lattice, out));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = logger::init(logger::level_from_verbosity(cli.verbose));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(s: &str) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("dview").chain(s.split_whitespace()))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_options() {
        let cli = parse("defects ref.dat in.dat --config my.json --free xz -v").unwrap();
        match &cli.command {
            Command::Defects { reference, input } => {
                assert_eq!(reference, "ref.dat");
                assert_eq!(input, "in.dat");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cli.config, Some(PathBuf::from("my.json")));
        assert_eq!(cli.pbc(), [false, true, false]);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_defaults_are_periodic() {
        let cli = parse("rdf in.dat -vv").unwrap();
        assert_eq!(cli.pbc(), [true; 3]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_negative_coordinates() {
        let cli = parse("pick r i -1.5 2 3").unwrap();
        match cli.command {
            Command::Pick { x, y, z, .. } => assert_eq!([x, y, z], [-1.5, 2.0, 3.0]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_fcc_remove_list() {
        let cli = parse("fcc 2 2 2 3.6 Cu out.dat --remove 5,0,5").unwrap();
        match cli.command {
            Command::Fcc { remove, a0, .. } => {
                assert_eq!(remove, vec![5, 0, 5]);
                assert_eq!(a0, 3.6);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("bogus in.dat").is_err());
        assert!(parse("rdf in.dat --bogus").is_err());
        assert!(parse("rdf in.dat --free w").is_err());
        assert!(parse("rdf in.dat --config").is_err());
        assert!(parse("pick r i 1 2").is_err());
        assert!(parse("fcc 2 2 x 3.6 Cu out.dat").is_err());
    }

    #[test]
    fn test_free_axes() {
        assert_eq!(parse_free_axes("").unwrap(), [true; 3]);
        assert_eq!(parse_free_axes("Zy").unwrap(), [true, false, false]);
        assert!(parse_free_axes("q").is_err());
    }
}
