use super::*;

impl Default for EiaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.eia.gov/v2".to_string(),
            use_real_api: true,
            state_id: "AZ".to_string(),
            request_timeout_secs: 10,
            fallback_residential_rate: 13.5,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            live_cache_ttl_secs: 5 * 60,
            historical_cache_ttl_secs: 30 * 60,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_enabled: true,
            probe_host: "api.eia.gov:443".to_string(),
            probe_interval_secs: 15,
            probe_timeout_ms: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/gridwatch.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eia: EiaConfig::default(),
            regions: vec!["AZPS".to_string(), "SRP".to_string()],
            polling: PollingConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
            timezone: "America/Phoenix".to_string(),
            synthesis_seed: None,
        }
    }
}
