//! addrfix is a Command Line Interface (CLI) for cleaning address records that
//! are shared between entities.
//!
//! It reads three CSV tables from a data directory: addresses (`fa.csv`),
//! entities (`fe.csv`), and the relationships linking them (`r_fe_fa.csv`).
//! A set of correction rules proposes fixes to ZIP codes, street names, and
//! city names. Proposals are then resolved: when entities sharing an address
//! disagree on a fix, the majority value is applied and every minority value
//! is split off into a freshly minted address ID.
//!
//! # Usage
//!
//! View CLI help with `addrfix help` or `addrfix help <subcommand>`.
//!
//! ## Configuration
//!
//! Every setting has a default, so no configuration file is required. To
//! change them, either:
//!
//! - Place a configuration file at `~/.config/addrfix/addrfix.toml`
//! - Use the `--config path/to/addrfix.toml` flag
//! - Set environment variables such as `ADDRFIX_RULES__CITY_THRESHOLD=0.2`
//!
//! Command-line flags win over all of the above.
//!
//! ```toml
//! [data]
//! input_dir = "data"
//! output_dir = "data_cleaned_split_all_rules"
//!
//! [rules]
//! enabled = ["fill-missing-zips", "street-names", "replace-invalid-zips", "zips-by-address", "city-names"]
//! street_threshold = 0.1
//! city_threshold = 0.1
//!
//! [report]
//! samples = 5
//! split_shared_addresses = false
//! ```
//!
//! ## Rules
//!
//! Rules always run in this order, whatever order they're enabled in:
//!
//! | Name                   | Effect                                                                                   |
//! |-                       |-                                                                                         |
//! | `fill-missing-zips`    | Fill blank ZIPs from the single valid ZIP of the same entity, house number, and street.  |
//! | `street-names`         | Merge near-identical street spellings per entity and house number to the most common one. |
//! | `replace-invalid-zips` | Replace malformed ZIPs the same way `fill-missing-zips` fills blank ones.                |
//! | `zips-by-address`      | Fill blank ZIPs from the single valid ZIP of the same state, city, street, and number.   |
//! | `city-names`           | Merge near-identical city spellings within each valid ZIP to the most common one.        |
//!
//! A valid ZIP is an underscore followed by five digits, e.g. `_02139`.
//!
//! ## Commands
//!
//! ```addrfix config```
//!
//! Echoes current config (with any overrides applied) and exits.
//!
//! ```addrfix run```
//!
//! Runs the enabled rules, resolves their proposals, optionally splits AIDs
//! shared by entities that see different addresses (`--split-shared`), and
//! writes `fa_cleaned.csv` and `r_fe_fa_cleaned.csv` to the output directory.
//!
//! ```addrfix propose [--output FILE]```
//!
//! Prints what the rules would change without writing any table. Proposals can
//! be exported as JSON (`.json`) or CSV.
//!
//! ```addrfix split```
//!
//! Runs only the shared-address split and writes the tables.
//!
//! ## Examples
//!
//! ```shell
//! # Clean ./data into ./data_cleaned_split_all_rules
//! addrfix run
//!
//! # Only repair ZIPs, with a different data directory
//! addrfix -d ~/exports run --rules fill-missing-zips,replace-invalid-zips
//!
//! # Review city fixes with a looser threshold
//! addrfix propose --rules city-names --city-threshold 0.2 --output cities.json
//! ```
//!
//! Set `RUST_LOG=debug` to see per-cluster and per-split decisions.

#[cfg(not(debug_assertions))]
use human_panic::setup_panic;

mod app_config;
mod cli;
mod core;

use anyhow::Result;

#[doc(hidden)]
/// Main entrypoint
pub fn run() -> Result<()> {
    // Human Panic. Only enabled when *not* debugging.
    //
    // Example of what panic message looks like:
    // https://docs.rs/human-panic/1.0.3/human_panic/
    #[cfg(not(debug_assertions))]
    {
        setup_panic!();
    }

    // Better Panic. Only enabled *when* debugging.
    #[cfg(debug_assertions)]
    {
        better_panic::Settings::debug()
            .most_recent_first(false)
            .lineno_suffix(true)
            .verbosity(better_panic::Verbosity::Full)
            .install();
    }

    // Setup Logging
    env_logger::init();

    // Get CLI arguments and flags (one may have provided the config file to use)
    let cli_matches = cli::cli_config()?;

    // Defaults, then config file, then environment. CLI flags are applied
    // per subcommand in cli_match.
    let settings = app_config::load_settings(cli_matches.value_of("config"))?;

    // Match against CLI subcommands, which delegate to functions
    cli::cli_match(settings, cli_matches)
}
