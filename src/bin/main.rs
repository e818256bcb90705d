use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::fs;
use std::path::{Path, PathBuf};

use classpatch::classfile::disasm::disassemble;
use classpatch::classfile::ClassReader;
use classpatch::{Bus, Config, RegistrarClassBuilder, SubscriberAnnotation, SubscriberMetadata};

#[derive(Parser)]
#[command(name = "classpatch")]
#[command(about = "Event class rewriter and registrar generator")]
#[command(version)]
struct Cli {
    /// Fail when a method cannot be added instead of skipping it
    #[arg(long, global = true)]
    strict: bool,

    /// Skip structural verification of produced classes
    #[arg(long, global = true)]
    no_verify: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite event classes (a .class file or a directory tree)
    Transform {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file or directory; defaults to rewriting in place
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// Generate a holder class with a registrar method for one subscriber
    Registrar {
        /// Internal name of the holder class, e.g. com/example/Registrars
        #[arg(long, value_name = "CLASS")]
        owner: String,

        /// Internal name of the subscriber class
        #[arg(long, value_name = "CLASS")]
        subscriber: String,

        /// Registrar method name
        #[arg(long, value_name = "NAME")]
        method: Option<String>,

        /// The subscriber has instance event handlers
        #[arg(long)]
        instance: bool,

        /// The subscriber has static event handlers
        #[arg(long = "static")]
        static_handlers: bool,

        /// The subscriber is an interface
        #[arg(long)]
        interface: bool,

        /// Register the subscriber on an event bus (forge or mod)
        #[arg(long, value_name = "BUS")]
        bus: Option<Bus>,

        /// Restrict bus registration to the client
        #[arg(long, requires = "bus")]
        client: bool,

        /// Restrict bus registration to the dedicated server
        #[arg(long, requires = "bus")]
        server: bool,

        #[arg(long, value_name = "ID", requires = "bus")]
        target_mod_id: Option<String>,

        /// Output .class file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Print the members of a class and disassemble its methods
    Dump {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::from_env();
    if cli.strict {
        config.strict = true;
    }
    if cli.no_verify {
        config.verify = false;
    }

    match &cli.command {
        Commands::Transform { input, output } => transform(input, output.as_deref(), &config),
        Commands::Registrar {
            owner,
            subscriber,
            method,
            instance,
            static_handlers,
            interface,
            bus,
            client,
            server,
            target_mod_id,
            output,
        } => {
            let mut metadata = SubscriberMetadata::new(subscriber.as_str());
            metadata.instance_subscribers = *instance;
            metadata.static_subscribers = *static_handlers;
            metadata.interface = *interface;
            let annotation =
                bus.map(|bus| SubscriberAnnotation::from_flags(bus, *client, *server, target_mod_id.clone()));
            let bytes = RegistrarClassBuilder::new(owner.as_str())
                .subscriber(method.as_deref(), metadata, annotation)
                .build(&config)
                .with_context(|| format!("generating registrar class {}", owner))?;
            write_output(output, &bytes)?;
            println!("Wrote {}", output.display());
            Ok(())
        }
        Commands::Dump { input } => dump(input),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env().filter_level(level).format_timestamp(None).init();
}

fn transform(input: &Path, output: Option<&Path>, config: &Config) -> Result<()> {
    let output = output.unwrap_or(input);
    if input.is_dir() {
        let results = classpatch::transform_directory(input, output, config)
            .with_context(|| format!("reading {}", input.display()))?;
        let failed = results.iter().filter(|(_, result)| result.is_err()).count();
        for (path, result) in &results {
            if let Err(e) = result {
                eprintln!("{}: {}", path.display(), e);
            }
        }
        println!("Transformed {} of {} classes", results.len() - failed, results.len());
        if failed > 0 {
            bail!("{} classes failed to transform", failed);
        }
    } else {
        classpatch::transform_class_file(input, output, config)
            .with_context(|| format!("transforming {}", input.display()))?;
        println!("Transformed {}", input.display());
    }
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn dump(input: &Path) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let reader = ClassReader::new(&bytes)?;
    let class = reader.class_file();
    let pool = reader.constant_pool();

    println!("class {} (version {}.{})", reader.name(), class.major_version, class.minor_version);
    if let Some(super_name) = class.super_name()? {
        println!("  extends {}", super_name);
    }
    for visible in [true, false] {
        for annotation in class.annotations(visible)? {
            println!("  @{}", annotation.descriptor);
        }
    }
    for field in &class.fields {
        println!("  field {} {} (flags 0x{:04x})", field.name(pool)?, field.descriptor(pool)?, field.access_flags);
    }
    for method in &class.methods {
        println!(
            "  method {}{} (flags 0x{:04x})",
            method.name(pool)?,
            method.descriptor(pool)?,
            method.access_flags
        );
        for annotation in method.annotations(pool, true)? {
            println!("    @{}", annotation.descriptor);
        }
        if let Some(code) = method.code(pool) {
            let code = code?;
            println!("    max_stack={} max_locals={}", code.max_stack, code.max_locals);
            for instruction in disassemble(&code.code, pool)? {
                println!("    {}", instruction);
            }
        }
    }
    Ok(())
}
