pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# TELEMETRY SPOOL CONFIGURATION
# =============================================================================
# telemetry-spool accepts telemetry batches over HTTP, forwards them to a
# collector, and keeps every batch that could not be delivered in a durable
# on-disk spool until a later retry succeeds or the batch expires.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/telemetry-spool/config.yml
#   3. /etc/telemetry-spool/config.yml
#
# Any value may reference environment variables with $env{NAME}.

# =============================================================================
# SPOOL
# =============================================================================
spool:
  # Directory holding one file per undelivered batch. Nothing else should
  # write here.
  path: ~/.local/share/telemetry-spool/batches

  # Maximum number of batches kept on disk. Once reached, new failed batches
  # are dropped rather than growing the disk without bound.
  capacity: 1000

  # How often expired batches are purged, and how old a batch may get before
  # it is purged regardless of retry state.
  sweep_interval_seconds: 86400   # 1 day
  retention_seconds: 172800       # 2 days

# =============================================================================
# COLLECTOR
# =============================================================================
collector:
  # Batches are POSTed here byte for byte.
  url: http://127.0.0.1:4318/v1/telemetry
  timeout: 30s
  # Uncomment when producers send compressed payloads.
  # content_encoding: gzip

# =============================================================================
# DRAIN
# =============================================================================
drain:
  # How often spooled batches are retried.
  interval: 2s
  # Upper bound on batches retried per pass, so a large backlog never
  # starves live traffic.
  max_batches_per_pass: 100

# =============================================================================
# INGEST
# =============================================================================
ingest:
  # Producers POST raw batches to http://<listen>/v1/batches
  listen: 127.0.0.1:7110
"#
    .to_string()
}
