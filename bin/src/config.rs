//! constructr-etcd configs

pub mod cli {
    //! Parse from either cli or env var

    /// Default etcd host
    pub static DEFAULT_ETCD_HOST: &str = "localhost";
    /// Default etcd client port
    pub const DEFAULT_ETCD_PORT: u16 = 2379;
    /// Default request timeout in seconds
    pub const DEFAULT_REQUEST_TIMEOUT: u64 = 5;
    /// Default seed lock ttl in seconds
    pub const DEFAULT_LOCK_TTL: u64 = 20;
    /// Default node entry ttl in seconds
    pub const DEFAULT_NODE_TTL: u64 = 30;
    /// tokio worker thread name
    pub static DEFAULT_THREAD_NAME: &str = "constructr-worker";
    /// default log level. Can use this argument or CONSTRUCTR_LOG env var
    pub const DEFAULT_CONSTRUCTR_LOG: &str = "info";
    /// log as "json", "pretty" or "standard" (unstructured)
    pub static DEFAULT_LOG_FORMAT: &str = "standard";

    use std::{net::SocketAddr, time::Duration};

    use anyhow::{Context, Result};
    pub use clap::Parser;
    use clap::{Args, Subcommand};
    use etcd_coordination::{DEFAULT_PREFIX, KeyNamespace};

    #[derive(Parser, Debug, Clone, PartialEq, Eq)]
    #[clap(author, name = "constructr-etcd", bin_name = "constructr-etcd", about, long_about = None)]
    /// parses from cli & environment var. `.env` in the working dir is loaded as well
    pub struct Config {
        /// etcd host
        #[clap(long, env, value_parser, default_value = DEFAULT_ETCD_HOST)]
        pub etcd_host: String,
        /// etcd client port
        #[clap(long, env, value_parser, default_value_t = DEFAULT_ETCD_PORT)]
        pub etcd_port: u16,
        /// first path segment(s) of the coordination namespace
        #[clap(long, env, value_parser, default_value = DEFAULT_PREFIX)]
        pub constructr_prefix: String,
        /// name of the cluster to coordinate
        #[clap(long, env, value_parser)]
        pub cluster_name: String,
        /// per-request timeout in seconds
        #[clap(long, env, value_parser, default_value_t = DEFAULT_REQUEST_TIMEOUT)]
        pub request_timeout: u64,
        /// number of worker threads, defaults to the number of logical CPUs
        #[clap(long, env, value_parser)]
        pub threads: Option<usize>,
        /// Worker thread name
        #[clap(long, env, value_parser, default_value = DEFAULT_THREAD_NAME)]
        pub thread_name: String,
        /// set the log level. All valid RUST_LOG arguments are accepted
        #[clap(long, env, value_parser, default_value = DEFAULT_CONSTRUCTR_LOG)]
        pub constructr_log: String,
        /// log format: "json", "pretty" or "standard"
        #[clap(long, env, value_parser, default_value = DEFAULT_LOG_FORMAT)]
        pub log_format: String,
        #[clap(subcommand)]
        pub command: Command,
    }

    /// what to do against the coordination namespace
    #[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
    pub enum Command {
        /// list registered nodes
        Nodes,
        /// try to acquire the seed lock, prints "acquired" or "held"
        Lock {
            /// lock ttl in seconds
            #[clap(long, value_parser, default_value_t = DEFAULT_LOCK_TTL)]
            ttl: u64,
        },
        /// create this node's entry
        Register(SelfArgs),
        /// extend the lease on this node's existing entry
        Refresh(SelfArgs),
        /// register, then keep refreshing until ctrl-c
        Join {
            #[clap(flatten)]
            node: SelfArgs,
            /// seconds between refreshes, defaults to half the ttl
            #[clap(long, value_parser)]
            refresh_interval: Option<u64>,
        },
    }

    /// the calling node
    #[derive(Args, Debug, Clone, PartialEq, Eq)]
    pub struct SelfArgs {
        /// address this node is reachable at
        #[clap(long, env = "NODE_ADDR", value_parser)]
        pub node: SocketAddr,
        /// entry ttl in seconds
        #[clap(long, value_parser, default_value_t = DEFAULT_NODE_TTL)]
        pub ttl: u64,
    }

    impl Config {
        /// Create new request timeout as `Duration`
        pub fn request_timeout(&self) -> Duration {
            Duration::from_secs(self.request_timeout)
        }

        /// key namespace for the configured store and cluster
        pub fn namespace(&self) -> Result<KeyNamespace> {
            KeyNamespace::new(
                &self.etcd_host,
                self.etcd_port,
                &self.constructr_prefix,
                &self.cluster_name,
            )
            .context("invalid coordination namespace")
        }
    }

    impl SelfArgs {
        /// entry ttl as `Duration`
        pub fn ttl(&self) -> Duration {
            Duration::from_secs(self.ttl)
        }
    }

    /// refresh well inside the ttl, but not more than once a second
    pub fn refresh_interval(ttl: Duration, configured: Option<u64>) -> Duration {
        configured
            .map(Duration::from_secs)
            .unwrap_or(ttl / 2)
            .max(Duration::from_secs(1))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config =
                Config::try_parse_from(["constructr-etcd", "--cluster-name", "demo", "nodes"])
                    .unwrap();
            assert_eq!(config.etcd_host, DEFAULT_ETCD_HOST);
            assert_eq!(config.etcd_port, DEFAULT_ETCD_PORT);
            assert_eq!(config.constructr_prefix, "constructr");
            assert_eq!(config.request_timeout(), Duration::from_secs(5));
            assert_eq!(config.command, Command::Nodes);

            let namespace = config.namespace().unwrap();
            assert_eq!(
                namespace.nodes_url().as_str(),
                "http://localhost:2379/v2/keys/constructr/demo/nodes"
            );
        }

        #[test]
        fn test_join_args() {
            let config = Config::try_parse_from([
                "constructr-etcd",
                "--etcd-host",
                "etcd.internal",
                "--etcd-port",
                "4001",
                "--cluster-name",
                "demo",
                "join",
                "--node",
                "10.0.0.1:2552",
                "--ttl",
                "10",
            ])
            .unwrap();
            let Command::Join {
                node,
                refresh_interval,
            } = config.command
            else {
                panic!("expected join");
            };
            assert_eq!(node.node, "10.0.0.1:2552".parse().unwrap());
            assert_eq!(node.ttl(), Duration::from_secs(10));
            assert_eq!(refresh_interval, None);
        }

        #[test]
        fn test_bad_node_rejected() {
            let result = Config::try_parse_from([
                "constructr-etcd",
                "--cluster-name",
                "demo",
                "register",
                "--node",
                "not-an-address",
            ]);
            assert!(result.is_err());
        }

        #[test]
        fn test_bad_cluster_name_rejected() {
            let config = Config::try_parse_from([
                "constructr-etcd",
                "--cluster-name",
                "has space",
                "lock",
            ])
            .unwrap();
            assert_eq!(config.command, Command::Lock { ttl: DEFAULT_LOCK_TTL });
            assert!(config.namespace().is_err());
        }

        #[test]
        fn test_refresh_interval() {
            assert_eq!(
                refresh_interval(Duration::from_secs(30), None),
                Duration::from_secs(15)
            );
            assert_eq!(
                refresh_interval(Duration::from_secs(1), None),
                Duration::from_secs(1)
            );
            assert_eq!(
                refresh_interval(Duration::from_secs(30), Some(0)),
                Duration::from_secs(1)
            );
            assert_eq!(
                refresh_interval(Duration::from_secs(30), Some(7)),
                Duration::from_secs(7)
            );
        }
    }
}

pub mod trace {
    //! tracing configuration
    use anyhow::Result;
    use tracing_subscriber::{
        filter::EnvFilter,
        fmt::{
            self,
            format::{Format, PrettyFields},
        },
        prelude::__tracing_subscriber_SubscriberExt,
        util::SubscriberInitExt,
    };

    /// Configuration for the global tracing subscriber
    #[derive(Debug)]
    pub struct Config {
        /// formatting to apply to logs
        pub log_frmt: String,
    }

    impl Config {
        /// Install the global subscriber. Fails if one is already installed.
        pub fn init(constructr_log: &str, log_frmt: &str) -> Result<Self> {
            let filter = EnvFilter::try_new(constructr_log)
                .or_else(|_| EnvFilter::try_new("info"))?
                .add_directive("hyper=off".parse()?)
                .add_directive("reqwest=warn".parse()?);

            match log_frmt {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .try_init()?;
                }
                "pretty" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(
                            fmt::layer()
                                .event_format(
                                    Format::default().pretty().with_source_location(false),
                                )
                                .fmt_fields(PrettyFields::new()),
                        )
                        .try_init()?;
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer())
                        .try_init()?;
                }
            }

            Ok(Self {
                log_frmt: log_frmt.to_owned(),
            })
        }
    }

}
