/// Centralized argument handling
///
/// Stores the process arguments once and offers flag/value lookups so that the
/// logger, config loader and binary all read the same source.
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::env;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Override the stored arguments (used by tests and embedding callers)
pub fn set_cmd_args(args: Vec<String>) {
    *CMD_ARGS.lock() = args;
}

/// Copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    CMD_ARGS.lock().clone()
}

pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Value following a flag, e.g. `--config path/to/file.toml`
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .filter(|v| !v.starts_with("--"))
        .cloned()
}

/// All values following a flag up to the next `--flag`
pub fn get_arg_values(flag: &str) -> Vec<String> {
    let args = get_cmd_args();
    match args.iter().position(|a| a == flag) {
        Some(i) => args[i + 1..]
            .iter()
            .take_while(|v| !v.starts_with("--"))
            .cloned()
            .collect(),
        None => Vec::new(),
    }
}

pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

pub fn get_config_path_override() -> Option<String> {
    get_arg_value("--config")
}

/// One-shot query mode: `--query <name> [args...]`
pub fn get_query_request() -> Option<Vec<String>> {
    let values = get_arg_values("--query");
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

pub fn is_scheduler_disabled() -> bool {
    has_arg("--no-scheduler")
}

pub fn print_help() {
    println!("coinvote - market-data gateway for the coin listing and voting site");
    println!();
    println!("USAGE:");
    println!("    coinvote [FLAGS]");
    println!();
    println!("CORE FLAGS:");
    println!("    --config <path>           Load configuration from <path>");
    println!("    --query <name> [args]     Run one query, print the JSON envelope and exit");
    println!("                              names: top-coins [page] [per_page], trending,");
    println!("                              listings [limit] [start], gainers [limit],");
    println!("                              pools <chain> <address>, search <text>,");
    println!("                              votes <subject>, status");
    println!("    --no-scheduler            Run without background tasks");
    println!("    --help, -h                Show this help message");
    println!();
    println!("LOGGING FLAGS:");
    println!("    --debug-<module>          Debug output for api, queue, cache, scheduler,");
    println!("                              votes, gateway, config, system (or 'all')");
    println!("    --verbose                 Verbose output for every module");
    println!("    --verbose-<module>        Verbose output for one module");
    println!("    --log-tags=a,b            Only print the listed modules");
    println!("    --quiet                   Warnings and errors only");
    println!("    --no-log-file             Console output only");
    println!();
    println!("EXAMPLES:");
    println!("    coinvote                                   # Run gateway with scheduler");
    println!("    coinvote --query top-coins 1 50            # Print page 1 of top coins");
    println!("    coinvote --query pools solana <mint>       # Print DEX pools for a token");
    println!("    coinvote --debug-queue --debug-cache       # Trace throttling and caching");
}

#[cfg(test)]
mod tests {
    use super::*;

    // Arguments are process-global; keep every assertion in one test.
    #[test]
    fn test_argument_lookups() {
        set_cmd_args(
            ["coinvote", "--config", "/tmp/c.toml", "--query", "pools", "solana", "abc", "--quiet"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        assert!(has_arg("--quiet"));
        assert_eq!(get_config_path_override().as_deref(), Some("/tmp/c.toml"));
        assert_eq!(
            get_query_request(),
            Some(vec!["pools".to_string(), "solana".to_string(), "abc".to_string()])
        );
        assert_eq!(get_arg_value("--quiet"), None);
        assert!(!is_scheduler_disabled());
    }
}
