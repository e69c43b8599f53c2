//! Per-OS install recipes
//!
//! Recipes live in one table keyed by (dependency, OS family). Adding an OS
//! or a dependency means adding rows; `select` never branches on either.

use std::path::PathBuf;

use super::Dependency;
use crate::detection::OsFamily;
use crate::process::CommandSpec;

/// Inputs a recipe may depend on
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub os: OsFamily,
    pub runtime_major: u64,
    pub database_major: u64,
    /// `nvm.sh`, the unknown-OS fallback for Node.js
    pub version_manager: Option<PathBuf>,
}

/// An ordered list of commands that installs one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub label: &'static str,
    /// Prints the installed executable when it lands outside PATH
    pub bin_query: Option<CommandSpec>,
    pub steps: Vec<CommandSpec>,
}

type Recipe = fn(&StrategyContext) -> Option<Strategy>;

const STRATEGY_TABLE: &[(Dependency, OsFamily, Recipe)] = &[
    (Dependency::DownloadTool, OsFamily::MacOs, brew_curl),
    (Dependency::DownloadTool, OsFamily::Debian, apt_curl),
    (Dependency::DownloadTool, OsFamily::RedHat, yum_curl),
    (Dependency::ArchiveTool, OsFamily::MacOs, brew_unzip),
    (Dependency::ArchiveTool, OsFamily::Debian, apt_unzip),
    (Dependency::ArchiveTool, OsFamily::RedHat, yum_unzip),
    (Dependency::Runtime, OsFamily::MacOs, brew_node),
    (Dependency::Runtime, OsFamily::Debian, nodesource_deb),
    (Dependency::Runtime, OsFamily::RedHat, nodesource_rpm),
    (Dependency::Runtime, OsFamily::Unknown, nvm_node),
    // npm ships with Node.js, so the package manager reuses the runtime recipes
    (Dependency::PackageManager, OsFamily::MacOs, brew_node),
    (Dependency::PackageManager, OsFamily::Debian, nodesource_deb),
    (Dependency::PackageManager, OsFamily::RedHat, nodesource_rpm),
    (Dependency::PackageManager, OsFamily::Unknown, nvm_node),
    (Dependency::Database, OsFamily::MacOs, brew_mongodb),
    (Dependency::Database, OsFamily::Debian, apt_mongodb),
    (Dependency::Database, OsFamily::RedHat, yum_mongodb),
    (Dependency::Supervisor, OsFamily::MacOs, npm_global_pm2),
    (Dependency::Supervisor, OsFamily::Debian, npm_global_pm2_elevated),
    (Dependency::Supervisor, OsFamily::RedHat, npm_global_pm2_elevated),
    (Dependency::Supervisor, OsFamily::Unknown, npm_global_pm2),
];

/// The one recipe for `dependency` on this host, if any
pub fn select(dependency: Dependency, ctx: &StrategyContext) -> Option<Strategy> {
    STRATEGY_TABLE
        .iter()
        .find(|(dep, os, _)| *dep == dependency && *os == ctx.os)
        .and_then(|(_, _, recipe)| recipe(ctx))
}

fn brew(args: &[&str]) -> CommandSpec {
    CommandSpec::new("brew").args(args.iter().copied())
}

fn apt_install(package: &str) -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("apt-get").arg("update").elevated(),
        CommandSpec::new("apt-get")
            .args(["install", "-y", package])
            .env("DEBIAN_FRONTEND", "noninteractive")
            .elevated(),
    ]
}

fn yum_install(package: &str) -> Vec<CommandSpec> {
    vec![CommandSpec::new("yum").args(["install", "-y", package]).elevated()]
}

fn brew_curl(_: &StrategyContext) -> Option<Strategy> {
    Some(Strategy {
        label: "Homebrew curl",
        bin_query: None,
        steps: vec![brew(&["install", "curl"])],
    })
}

fn apt_curl(_: &StrategyContext) -> Option<Strategy> {
    Some(Strategy {
        label: "apt curl",
        bin_query: None,
        steps: apt_install("curl"),
    })
}

fn yum_curl(_: &StrategyContext) -> Option<Strategy> {
    Some(Strategy {
        label: "yum curl",
        bin_query: None,
        steps: yum_install("curl"),
    })
}

fn brew_unzip(_: &StrategyContext) -> Option<Strategy> {
    Some(Strategy {
        label: "Homebrew unzip",
        bin_query: None,
        steps: vec![brew(&["install", "unzip"])],
    })
}

fn apt_unzip(_: &StrategyContext) -> Option<Strategy> {
    Some(Strategy {
        label: "apt unzip",
        bin_query: None,
        steps: apt_install("unzip"),
    })
}

fn yum_unzip(_: &StrategyContext) -> Option<Strategy> {
    Some(Strategy {
        label: "yum unzip",
        bin_query: None,
        steps: yum_install("unzip"),
    })
}

fn brew_node(ctx: &StrategyContext) -> Option<Strategy> {
    let formula = format!("node@{}", ctx.runtime_major);
    Some(Strategy {
        label: "Homebrew node formula",
        bin_query: None,
        steps: vec![
            brew(&["install", formula.as_str()]),
            brew(&["link", "--overwrite", "--force", formula.as_str()]),
        ],
    })
}

fn nodesource_deb(ctx: &StrategyContext) -> Option<Strategy> {
    let script = format!(
        "curl -fsSL https://deb.nodesource.com/setup_{}.x | bash -",
        ctx.runtime_major
    );
    let mut steps = vec![CommandSpec::shell(script).elevated()];
    // setup script already refreshes the apt index
    steps.extend(apt_install("nodejs").into_iter().skip(1));
    Some(Strategy {
        label: "NodeSource apt repository",
        bin_query: None,
        steps,
    })
}

fn nodesource_rpm(ctx: &StrategyContext) -> Option<Strategy> {
    let script = format!(
        "curl -fsSL https://rpm.nodesource.com/setup_{}.x | bash -",
        ctx.runtime_major
    );
    let mut steps = vec![CommandSpec::shell(script).elevated()];
    steps.extend(yum_install("nodejs"));
    Some(Strategy {
        label: "NodeSource yum repository",
        bin_query: None,
        steps,
    })
}

fn nvm_node(ctx: &StrategyContext) -> Option<Strategy> {
    let nvm = ctx.version_manager.as_ref()?;
    let script = format!(
        ". \"{}\" && nvm install {major} && nvm alias default {major}",
        nvm.display(),
        major = ctx.runtime_major
    );
    // nvm puts node under $NVM_DIR/versions/node/<version>/bin, which is only
    // on PATH for shells that source nvm.sh
    let which = format!(". \"{}\" && nvm which {}", nvm.display(), ctx.runtime_major);
    Some(Strategy {
        label: "nvm (user space)",
        bin_query: Some(CommandSpec::new("bash").arg("-c").arg(which)),
        steps: vec![CommandSpec::new("bash").arg("-c").arg(script)],
    })
}

fn brew_mongodb(_: &StrategyContext) -> Option<Strategy> {
    Some(Strategy {
        label: "Homebrew mongodb-community",
        bin_query: None,
        steps: vec![
            brew(&["tap", "mongodb/brew"]),
            brew(&["install", "mongodb-community"]),
            brew(&["services", "start", "mongodb-community"]),
        ],
    })
}

fn apt_mongodb(ctx: &StrategyContext) -> Option<Strategy> {
    let series = format!("{}.0", ctx.database_major);
    let keyring = format!("/usr/share/keyrings/mongodb-server-{series}.gpg");
    let repo = format!(
        ". /etc/os-release && \
         component=main; [ \"$ID\" = ubuntu ] && component=multiverse; \
         echo \"deb [ signed-by={keyring} ] https://repo.mongodb.org/apt/$ID $VERSION_CODENAME/mongodb-org/{series} $component\" \
         > /etc/apt/sources.list.d/mongodb-org-{series}.list"
    );
    let mut steps = vec![
        CommandSpec::shell(format!(
            "curl -fsSL https://www.mongodb.org/static/pgp/server-{series}.asc | gpg --dearmor --yes -o {keyring}"
        ))
        .elevated(),
        CommandSpec::shell(repo).elevated(),
    ];
    steps.extend(apt_install("mongodb-org"));
    steps.push(
        CommandSpec::new("systemctl")
            .args(["enable", "--now", "mongod"])
            .elevated(),
    );
    Some(Strategy {
        label: "MongoDB apt repository",
        bin_query: None,
        steps,
    })
}

fn yum_mongodb(ctx: &StrategyContext) -> Option<Strategy> {
    let series = format!("{}.0", ctx.database_major);
    let repo = format!(
        "printf '%s\\n' '[mongodb-org-{series}]' 'name=MongoDB Repository' \
         'baseurl=https://repo.mongodb.org/yum/redhat/$releasever/mongodb-org/{series}/x86_64/' \
         'gpgcheck=1' 'enabled=1' 'gpgkey=https://www.mongodb.org/static/pgp/server-{series}.asc' \
         > /etc/yum.repos.d/mongodb-org-{series}.repo"
    );
    let mut steps = vec![CommandSpec::shell(repo).elevated()];
    steps.extend(yum_install("mongodb-org"));
    steps.push(
        CommandSpec::new("systemctl")
            .args(["enable", "--now", "mongod"])
            .elevated(),
    );
    Some(Strategy {
        label: "MongoDB yum repository",
        bin_query: None,
        steps,
    })
}

fn npm_global_pm2(_: &StrategyContext) -> Option<Strategy> {
    Some(Strategy {
        label: "npm global pm2",
        bin_query: None,
        steps: vec![CommandSpec::new("npm").args(["install", "-g", "pm2"])],
    })
}

fn npm_global_pm2_elevated(_: &StrategyContext) -> Option<Strategy> {
    Some(Strategy {
        label: "npm global pm2",
        bin_query: None,
        steps: vec![CommandSpec::new("npm").args(["install", "-g", "pm2"]).elevated()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_DEPS: [Dependency; 6] = [
        Dependency::DownloadTool,
        Dependency::ArchiveTool,
        Dependency::Runtime,
        Dependency::PackageManager,
        Dependency::Database,
        Dependency::Supervisor,
    ];
    const ALL_OS: [OsFamily; 4] = [
        OsFamily::MacOs,
        OsFamily::Debian,
        OsFamily::RedHat,
        OsFamily::Unknown,
    ];

    fn ctx(os: OsFamily) -> StrategyContext {
        StrategyContext {
            os,
            runtime_major: 18,
            database_major: 7,
            version_manager: None,
        }
    }

    #[test]
    fn at_most_one_row_per_dependency_and_os() {
        for dep in ALL_DEPS {
            for os in ALL_OS {
                let rows = STRATEGY_TABLE
                    .iter()
                    .filter(|(d, o, _)| *d == dep && *o == os)
                    .count();
                assert!(rows <= 1, "{dep} on {os} has {rows} recipes");
            }
        }
    }

    #[test]
    fn every_known_os_can_install_every_dependency() {
        for dep in ALL_DEPS {
            for os in [OsFamily::MacOs, OsFamily::Debian, OsFamily::RedHat] {
                let strategy = select(dep, &ctx(os)).unwrap_or_else(|| panic!("{dep} on {os}"));
                assert!(!strategy.steps.is_empty());
            }
        }
    }

    #[test]
    fn macos_runtime_pins_and_force_links() {
        let strategy = select(Dependency::Runtime, &ctx(OsFamily::MacOs)).unwrap();
        let lines: Vec<String> = strategy.steps.iter().map(CommandSpec::display).collect();
        assert_eq!(
            lines,
            vec!["brew install node@18", "brew link --overwrite --force node@18"]
        );
        assert!(strategy.steps.iter().all(|s| !s.elevated), "brew refuses root");
    }

    #[test]
    fn linux_recipes_are_elevated() {
        for os in [OsFamily::Debian, OsFamily::RedHat] {
            let strategy = select(Dependency::Database, &ctx(os)).unwrap();
            assert!(strategy.steps.iter().all(|s| s.elevated));
            assert!(strategy.steps.last().unwrap().display().contains("enable --now mongod"));
        }
    }

    #[test]
    fn unknown_os_falls_back_to_nvm_when_present() {
        assert!(select(Dependency::Runtime, &ctx(OsFamily::Unknown)).is_none());
        assert!(select(Dependency::Database, &ctx(OsFamily::Unknown)).is_none());

        let mut with_nvm = ctx(OsFamily::Unknown);
        with_nvm.version_manager = Some(PathBuf::from("/home/op/.nvm/nvm.sh"));
        let strategy = select(Dependency::Runtime, &with_nvm).unwrap();
        assert_eq!(strategy.label, "nvm (user space)");
        assert!(strategy.steps[0].display().contains("nvm install 18"));
        let query = strategy.bin_query.expect("nvm installs outside PATH");
        assert!(query.display().ends_with("nvm which 18"));
    }
}
