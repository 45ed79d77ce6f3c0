use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use netool::network::HostProbeKind;
use netool::utils::validator;
use netool::{Digger, OutputFormat, RecordKind, Report, ScanConfig, ScanError, Scanner};
use std::path::PathBuf;
use std::process;

fn build_cli() -> Command {
    let host_arg = || {
        Arg::new("host")
            .long("host")
            .value_name("HOST")
            .help("Domain or host name to look up, eg. example.com")
            .required(true)
    };

    Command::new("netool")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Query IP, NS, CNAME and MX records; scan networks for live hosts and hosts for open ports")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Configuration file (TOML). Default: ~/.netool.toml")
                .global(true),
        )
        .arg(
            Arg::new("concurrency")
                .short('c')
                .long("concurrency")
                .value_name("COUNT")
                .help("Number of concurrent probe workers")
                .value_parser(clap::value_parser!(usize))
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .help("Per-probe timeout in milliseconds")
                .value_parser(clap::value_parser!(u64))
                .global(true),
        )
        .arg(
            Arg::new("host-probe")
                .long("host-probe")
                .value_name("KIND")
                .help("How to decide a host is alive: system ping, raw ICMP (needs root) or TCP")
                .value_parser(["ping", "icmp", "tcp"])
                .global(true),
        )
        .arg(
            Arg::new("services")
                .long("services")
                .value_name("CSV")
                .help("IANA service-names-port-numbers.csv used to name open ports")
                .global(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FORMAT")
                .help("Output format")
                .value_parser(["table", "json", "csv"])
                .default_value("table")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("dig")
                .about("Look up the A, CNAME, NS and MX records of a domain")
                .arg(
                    Arg::new("domain")
                        .value_name("DOMAIN")
                        .help("Domain name, eg. example.com")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("port")
                .about("Scan open ports of a host")
                .arg(
                    Arg::new("host")
                        .value_name("HOST")
                        .help("Host name or IP address, eg. example.com or 10.1.1.1")
                        .required(true),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORTS")
                        .help("Ports to scan, eg. 80,100-200. Default: 1-1023,3389"),
                ),
        )
        .subcommand(
            Command::new("net")
                .about("Scan a network for hosts that are alive")
                .arg(
                    Arg::new("cidr")
                        .value_name("CIDR")
                        .help("CIDR notation, eg. 192.168.1.1/24")
                        .required(true),
                ),
        )
        .subcommand(Command::new("ip").about("Look up the addresses of a host").arg(host_arg()))
        .subcommand(Command::new("ns").about("Look up the name servers of a domain").arg(host_arg()))
        .subcommand(Command::new("cname").about("Look up the canonical name of a host").arg(host_arg()))
        .subcommand(Command::new("mx").about("Look up the mail exchangers of a domain").arg(host_arg()))
        .subcommand(
            Command::new("scan")
                .about("Scan ports of a host")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("Host name or IP address")
                        .required(true),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORTS")
                        .help("Ports to scan, eg. 80,100-200"),
                ),
        )
}

fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// defaults < config file < flags
fn load_config(matches: &ArgMatches) -> netool::Result<ScanConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(config_file) => {
            let config = ScanConfig::from_toml_file(config_file)?;
            eprintln!("{} {}", "[~] Loaded config from".bright_blue(), config_file);
            config
        }
        None => ScanConfig::load_default_config(),
    };

    if let Some(&concurrency) = matches.get_one::<usize>("concurrency") {
        config = config.with_concurrency(concurrency);
    }
    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(timeout);
    }
    if let Some(kind) = matches.get_one::<String>("host-probe") {
        let kind: HostProbeKind = kind.parse().map_err(ScanError::ConfigError)?;
        config = config.with_host_probe(kind);
    }
    if let Some(services) = matches.get_one::<String>("services") {
        config = config.with_services_file(PathBuf::from(services));
    }

    config.validate()?;
    Ok(config)
}

fn print_report(report: &Report, format: OutputFormat) -> netool::Result<()> {
    let rendered = report.render(format)?;
    match format {
        OutputFormat::Table => {
            println!();
            println!("{}", rendered);
            println!();
        }
        OutputFormat::Json | OutputFormat::Csv => println!("{}", rendered.trim_end()),
    }
    Ok(())
}

async fn run(command: &str, matches: &ArgMatches, config: ScanConfig) -> netool::Result<()> {
    let format = matches
        .get_one::<String>("output")
        .map(|f| f.parse::<OutputFormat>())
        .transpose()
        .map_err(ScanError::ConfigError)?
        .unwrap_or_default();

    match command {
        "dig" => {
            let domain = required(matches, "domain")?;
            validator::validate_domain(domain)?;

            let records = Digger::system()?.dig(domain).await?;
            print_report(&Report::dns(&records), format)
        }
        "ip" | "ns" | "cname" | "mx" => {
            let host = required(matches, "host")?;
            let kind = match command {
                "ip" => RecordKind::A,
                "ns" => RecordKind::Ns,
                "cname" => RecordKind::Cname,
                _ => RecordKind::Mx,
            };

            let records = Digger::system()?.lookup(host, kind).await?;
            if records.is_empty() {
                println!("{} No {} records found for {}", "[!]".bright_yellow(), kind, host);
                return Ok(());
            }
            print_report(&Report::dns(&records), format)
        }
        "net" => {
            let cidr = required(matches, "cidr")?;
            validator::validate_cidr(cidr)?;

            let scanner = Scanner::new(config)?;
            eprintln!("{} {}", "[~] Scanning net".bright_blue(), cidr.bright_cyan());

            let hosts = scanner.scan_network(cidr).await?;
            if hosts.is_empty() {
                println!("{}", "No host alive found!".bright_yellow());
                return Ok(());
            }
            eprintln!("{} {} hosts up", "[+]".bright_green(), hosts.len());
            print_report(&Report::hosts(&hosts), format)
        }
        "port" | "scan" => {
            let host = required(matches, "host")?;
            let port_spec = matches
                .get_one::<String>("port")
                .cloned()
                .unwrap_or_else(|| config.default_ports.clone());
            validator::validate_host(host)?;
            validator::validate_port_spec(&port_spec)?;

            let scanner = Scanner::new(config)?;
            eprintln!(
                "{} {} {} {}",
                "[~] Scanning".bright_blue(),
                host.bright_cyan(),
                "ports".bright_blue(),
                port_spec.bright_cyan()
            );

            let ports = scanner.scan_ports(host, &port_spec).await?;
            if ports.is_empty() {
                println!("{}", "No open ports found!".bright_yellow());
                return Ok(());
            }
            eprintln!("{} {} open ports", "[+]".bright_green(), ports.len());
            print_report(&Report::ports(&ports), format)
        }
        other => Err(ScanError::ConfigError(format!("Unknown command: {}", other))),
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> netool::Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| ScanError::ConfigError(format!("Missing argument: {}", name)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();
    let Some((command, sub_matches)) = matches.subcommand() else {
        build_cli().print_help()?;
        process::exit(1);
    };

    init_logging(sub_matches.get_count("verbose"));

    if sub_matches.get_flag("no-color") {
        colored::control::set_override(false);
    }

    let config = match load_config(sub_matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "[!]".bright_red(), e.to_string().bright_red());
            process::exit(1);
        }
    };

    match run(command, sub_matches, config).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_input_error() => {
            eprintln!("{} {}", "[!]".bright_red(), e.to_string().bright_red());
            eprintln!("Run 'netool {} --help' for usage", command);
            process::exit(1);
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("netool {} failed", command))),
    }
}
