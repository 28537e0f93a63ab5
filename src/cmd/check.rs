//! A subcommand making sure the configuration makes sense. Useful before
//! restarting the server with a new configuration.

use termcolor::ColorChoice;

use crate::{
    args,
    auth::FEDORA_ADMIN_ROLE,
    config::Config,
    load_config_and_init_logger,
    prelude::*,
};


pub(crate) fn run(shared: &args::Shared, color: ColorChoice) -> Result<()> {
    let config = load_config_and_init_logger(shared, color, "check")
        .context("failed to load config: cannot proceed with `check` command")?;

    info!("Starting to verify various things...");
    config.lint();
    let admin_service = check_admin_service(&config);
    let unix_socket = check_unix_socket_dir(&config);
    info!("Done verifying various things");


    // Print summary after all log output
    let mut any_errors = false;
    println!();
    bunt::println!("{$bold+blue+intense}Summary{/$}");
    println!();
    print_outcome(&mut any_errors, "Load configuration", &Ok(()));
    print_outcome(&mut any_errors, "Trusted service with admin role", &admin_service);
    print_outcome(&mut any_errors, "Unix socket directory", &unix_socket);

    println!();
    if any_errors {
        bunt::println!("{$red+intense}➡  Errors have occured!{/$}");
        std::process::exit(1);
    } else {
        bunt::println!("{$green+intense}⮕  Everything OK{/$}");
        Ok(())
    }
}

fn print_outcome<T>(any_errors: &mut bool, label: &str, result: &Result<T>) {
    match result {
        Ok(_) => {
            bunt::println!(" ▸ {[bold+intense]}  {$green+bold}✔ ok{/$}", label);
        }
        Err(e) => {
            *any_errors = true;
            bunt::println!(" ▸ {[bold+intense]}  {$red+bold}✘ error{/$}", label);
            bunt::println!("      {$red}▶▶▶ {$bold}Error:{/$}{/$} {[yellow+intense]}", e);
            for (i, cause) in e.chain().skip(1).enumerate() {
                print!("       {: >1$}", "", i * 2);
                println!("‣ {cause}");
            }
            println!();
        }
    }
}

fn check_admin_service(config: &Config) -> Result<()> {
    let admins = config.container.trusted_services.iter()
        .filter(|s| s.roles.contains(FEDORA_ADMIN_ROLE))
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>();

    if admins.is_empty() {
        bail!("no trusted service has the role '{FEDORA_ADMIN_ROLE}', \
            so the groups header is never honored");
    }
    debug!("Services allowed to assert groups: {}", admins.join(", "));
    Ok(())
}

fn check_unix_socket_dir(config: &Config) -> Result<()> {
    let Some(socket) = &config.http.unix_socket else {
        return Ok(());
    };

    let dir = socket.parent()
        .ok_or_else(|| anyhow!("socket path '{}' has no parent", socket.display()))?;
    if !dir.is_dir() {
        bail!("directory '{}' for the unix socket does not exist", dir.display());
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use confique::Config as _;

    use super::*;
    use crate::auth::TrustedService;

    #[test]
    fn admin_service_required() {
        let mut config = Config::builder().load().unwrap();
        assert!(check_admin_service(&config).is_err());

        config.container.trusted_services.push(TrustedService {
            name: "django".into(),
            key: "key".into(),
            roles: HashSet::from([FEDORA_ADMIN_ROLE.to_owned()]),
        });
        assert!(check_admin_service(&config).is_ok());
    }

    #[test]
    fn unix_socket_dir() {
        let mut config = Config::builder().load().unwrap();
        assert!(check_unix_socket_dir(&config).is_ok());

        config.http.unix_socket = Some(std::env::temp_dir().join("groupgate.sock"));
        assert!(check_unix_socket_dir(&config).is_ok());

        config.http.unix_socket = Some("/does/not/exist/groupgate.sock".into());
        assert!(check_unix_socket_dir(&config).is_err());
    }
}
