use clap::Parser;
use fbrcon_listener::{Cli, Runtime};
use std::{
  env,
  ffi::{OsStr, OsString},
};

const PRIMARY_PREFIX: &str = "FBRCON_";
const ALIAS_PREFIX: &str = "RCON_";

fn set_env_var(key: &str, value: &OsStr) {
  // SAFETY: called before the runtime starts any worker threads, and the value comes from the process environment.
  unsafe {
    env::set_var(key, value);
  }
}

/// Work out which variables to add so that `RCON_*` and `FBRCON_*` mirror
/// each other. A name that is already set is never overwritten.
fn alias_assignments(
  vars: &[(OsString, OsString)],
) -> Vec<(String, OsString)> {
  let is_set = |name: &str| vars.iter().any(|(key, _)| key == name);
  let mut assignments: Vec<(String, OsString)> = Vec::new();

  for (key, value) in vars {
    let Some(key_str) = key.to_str() else {
      continue;
    };

    let counterpart = if let Some(suffix) = key_str.strip_prefix(PRIMARY_PREFIX)
    {
      format!("{ALIAS_PREFIX}{suffix}")
    } else if let Some(suffix) = key_str.strip_prefix(ALIAS_PREFIX) {
      format!("{PRIMARY_PREFIX}{suffix}")
    } else {
      continue;
    };

    if !is_set(&counterpart)
      && !assignments.iter().any(|(name, _)| *name == counterpart)
    {
      assignments.push((counterpart, value.clone()));
    }
  }

  assignments
}

fn mirror_env_aliases() {
  let snapshot: Vec<(OsString, OsString)> = env::vars_os().collect();
  for (key, value) in alias_assignments(&snapshot) {
    set_env_var(&key, value.as_os_str());
  }
}

fn main() {
  mirror_env_aliases();

  let cli = Cli::parse();
  let exit_code = match tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
  {
    Ok(runtime) => runtime.block_on(Runtime::new(cli).execute()),
    Err(err) => {
      eprintln!("error: failed to start async runtime: {err}");
      1
    }
  };
  std::process::exit(exit_code);
}
