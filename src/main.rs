use clap::{ArgAction, Parser, ValueEnum};
use color_eyre::Result;
use statline::probe::{CpuInfo, DiskInfo, MemInfo, SwapInfo};
use statline::render;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "statline",
    about = "One-shot system telemetry for a status line"
)]
struct Cli {
    /// Collect every domain.
    #[arg(short, long)]
    all: bool,

    /// Mount point probed by the disk domain.
    #[arg(long, default_value = "/")]
    mount: String,

    /// Increase stderr diagnostics (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Domains to collect.
    #[arg(value_enum)]
    domains: Vec<Domain>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Domain {
    Cpu,
    Mem,
    Swap,
    Disk,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let selected = |domain| cli.all || cli.domains.contains(&domain);

    if selected(Domain::Cpu) {
        let mut cpu = CpuInfo::new();
        cpu.resolve_cores();
        cpu.resolve_model();
        cpu.resolve_load();
        cpu.resolve_usage();
        cpu.resolve_fan();
        cpu.resolve_temp();
        cpu.resolve_uptime();
        print!("{}", render::cpu_report(&cpu));
    }

    if selected(Domain::Mem) {
        let mut mem = MemInfo::new();
        mem.resolve_used();
        mem.resolve_total();
        mem.resolve_percent();
        print!("{}", render::mem_report(&mem));
    }

    if selected(Domain::Swap) {
        let mut swap = SwapInfo::new();
        swap.resolve_used();
        swap.resolve_total();
        swap.resolve_percent();
        print!("{}", render::swap_report(&swap));
    }

    if selected(Domain::Disk) {
        let mut disk = DiskInfo::new(cli.mount.clone());
        disk.resolve_device();
        disk.resolve_name();
        disk.resolve_mount();
        disk.resolve_fs_type();
        disk.resolve_used();
        disk.resolve_total();
        disk.resolve_percent();
        print!("{}", render::disk_report(&disk));
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
