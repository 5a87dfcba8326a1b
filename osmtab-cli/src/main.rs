//! osmtab: edit OpenStreetMap tags in a spreadsheet
//!
//! `export` writes the tags of an OSM XML file to a .tsv table, `import`
//! turns an edited table into a JOSM changefile.

use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use osmtab::{
    ChangefileWriter, EntityKind, ExportOptions, MergePolicy, ObjectSink, TsvWriter,
};
use tempfile::NamedTempFile;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Path meaning standard input.
const STDIN: &str = "-";

/// Tool to modify tags of OpenStreetMap objects using spreadsheet files
#[derive(Parser, Debug)]
#[command(name = "osmtab")]
#[command(version)]
#[command(
    about = "Tool to modify tags of OpenStreetMap objects using spreadsheet files",
    long_about = None
)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export tags of objects in an OSM XML file to a .tsv spreadsheet
    Export {
        /// OSM XML input file ("-" for stdin, needs --columns)
        osm_file: String,

        /// Output .tsv file (default: stdout)
        #[arg(short, long, value_name = "TSV_FILE")]
        output: Option<String>,

        /// Tag keys to output as columns (default: all keys found in the input)
        #[arg(short, long, num_args = 0.., value_name = "COLUMN")]
        columns: Option<Vec<String>>,

        /// Do not output rows whose tag columns are all empty
        #[arg(short = 'e', long)]
        skip_empty: bool,

        /// Output only these object types; repeat for several, e.g. -t way -t relation
        #[arg(short, long = "types", value_enum, value_name = "TYPE")]
        types: Vec<KindArg>,
    },

    /// Create a JOSM changefile from an OSM XML file and an edited .tsv spreadsheet
    Import {
        /// OSM XML input file the table was exported from ("-" for stdin)
        osm_file: String,

        /// Edited .tsv file with the tag changes ("-" for stdin)
        tsv_file: String,

        /// Output changefile (default: stdout)
        #[arg(short, long, value_name = "OSM_FILE")]
        output: Option<String>,

        /// Ignore columns whose name starts with COL_PREFIX
        #[arg(short = 'p', long, value_name = "COL_PREFIX")]
        ignore_prefix: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum KindArg {
    Node,
    Way,
    Relation,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Node => EntityKind::Node,
            KindArg::Way => EntityKind::Way,
            KindArg::Relation => EntityKind::Relation,
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Export {
            osm_file,
            output,
            columns,
            skip_empty,
            types,
        } => {
            let mut options = ExportOptions {
                skip_empty,
                ..ExportOptions::default()
            };
            if !types.is_empty() {
                options.kinds = types.into_iter().map(EntityKind::from).collect();
            }
            run_export(&osm_file, output.as_deref(), columns, options)
        }
        Commands::Import {
            osm_file,
            tsv_file,
            output,
            ignore_prefix,
        } => run_import(&osm_file, &tsv_file, output.as_deref(), ignore_prefix),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Runs the export: column discovery (unless columns are given), then rows.
fn run_export(
    osm_path: &str,
    output_path: Option<&str>,
    columns: Option<Vec<String>>,
    options: ExportOptions,
) -> Result<(), Box<dyn Error>> {
    let columns = match columns {
        Some(columns) => columns,
        None if osm_path == STDIN => {
            return Err("column discovery reads the input twice; \
                        use --columns when reading from stdin"
                .into())
        }
        None => {
            info!(path = osm_path, "discovering columns");
            osmtab::detect_columns(osm_path)?
        }
    };
    info!(columns = columns.len(), "exporting");

    let stats = with_output(output_path, |out| {
        let mut writer = TsvWriter::new(out, columns, options)?;
        parse_input(osm_path, &mut writer)?;
        let (_, stats) = writer.finish()?;
        Ok(stats)
    })?;

    info!(
        written = stats.written,
        skipped_empty = stats.skipped_empty,
        filtered_by_kind = stats.filtered_by_kind,
        "export complete"
    );
    Ok(())
}

/// Runs the import: load the table, then synthesize the changefile.
fn run_import(
    osm_path: &str,
    tsv_path: &str,
    output_path: Option<&str>,
    ignore_prefix: Option<String>,
) -> Result<(), Box<dyn Error>> {
    if osm_path == STDIN && tsv_path == STDIN {
        return Err("only one of the OSM file and the TSV file can be read from stdin".into());
    }

    info!(path = tsv_path, "loading edited table");
    let store = if tsv_path == STDIN {
        osmtab::load_tsv(io::stdin().lock())?
    } else {
        osmtab::load_tsv(File::open(tsv_path)?)?
    };
    info!(records = store.len(), "table loaded");

    let policy = match ignore_prefix {
        Some(prefix) => MergePolicy::new().with_ignore_prefix(prefix),
        None => MergePolicy::new(),
    };

    let stats = with_output(output_path, |out| {
        let mut writer = ChangefileWriter::new(&store, policy, out)?;
        parse_input(osm_path, &mut writer)?;
        let (_, stats) = writer.finish()?;
        Ok(stats)
    })?;

    info!(
        modified = stats.modified,
        unchanged = stats.unchanged,
        "changefile complete"
    );
    Ok(())
}

/// Streams the OSM input (a file or stdin) into `sink`.
fn parse_input<S: ObjectSink>(osm_path: &str, sink: S) -> osmtab::Result<usize> {
    if osm_path == STDIN {
        osmtab::parse_reader(io::stdin().lock(), sink)
    } else {
        osmtab::parse_file(osm_path, sink)
    }
}

/// Runs `write` against stdout or the output file.
///
/// File output goes to a temporary file next to the target, which replaces
/// the target only after `write` succeeded.
fn with_output<T, F>(output_path: Option<&str>, write: F) -> Result<T, Box<dyn Error>>
where
    F: FnOnce(&mut dyn Write) -> osmtab::Result<T>,
{
    match output_path {
        Some(path) => {
            let path = Path::new(path);
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let mut tmp = create_temp(dir, path)?;
            let value = {
                let mut writer = BufWriter::new(tmp.as_file_mut());
                let value = write(&mut writer)?;
                writer.flush()?;
                value
            };
            tmp.persist(path)?;
            Ok(value)
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            let value = write(&mut writer)?;
            writer.flush()?;
            Ok(value)
        }
    }
}

/// Creates the temporary output file in `dir`.
///
/// New files get the mode a plain create would give them (0666 less the
/// umask); an existing `target` keeps its mode when it is replaced.
fn create_temp(dir: &Path, target: &Path) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let tmp = builder.tempfile_in(dir)?;
    if let Ok(metadata) = fs::metadata(target) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }
    Ok(tmp)
}
