use std::env;
use std::str::FromStr;
use dotenvy::dotenv;

use crate::attendance::lifecycle::LifecycleOptions;
use crate::attendance::work_hours::WorkHoursPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Attendance policy
    pub enforce_schedule: bool,
    pub enforce_work_hours: bool,
    pub full_time_required_hours: i64,
    pub part_time_required_hours: i64,
    pub schedule_cache_ttl_secs: u64,

    pub upload_dir: String,
    pub log_dir: String,
}

fn var_or<T>(key: &str, default: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Debug,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|e| panic!("{key} is invalid: {e:?}"))
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", "1000"),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            enforce_schedule: var_or("ENFORCE_SCHEDULE", "true"),
            enforce_work_hours: var_or("ENFORCE_WORK_HOURS", "true"),
            full_time_required_hours: var_or("FULL_TIME_REQUIRED_HOURS", "8"),
            part_time_required_hours: var_or("PART_TIME_REQUIRED_HOURS", "4"),
            schedule_cache_ttl_secs: var_or("SCHEDULE_CACHE_TTL_SECS", "60"),

            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }

    pub fn lifecycle_options(&self) -> LifecycleOptions {
        LifecycleOptions {
            enforce_schedule: self.enforce_schedule,
            enforce_work_hours: self.enforce_work_hours,
            policy: WorkHoursPolicy::from_hours(
                self.full_time_required_hours,
                self.part_time_required_hours,
            ),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            enforce_schedule: true,
            enforce_work_hours: true,
            full_time_required_hours: 8,
            part_time_required_hours: 4,
            schedule_cache_ttl_secs: 60,
            upload_dir: "uploads".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_hours_flow_into_lifecycle_options() {
        let config = Config {
            full_time_required_hours: 7,
            enforce_schedule: false,
            ..Config::for_tests()
        };
        let options = config.lifecycle_options();

        assert!(!options.enforce_schedule);
        assert_eq!(options.policy.full_time, chrono::Duration::hours(7));
        assert_eq!(options.policy.part_time, chrono::Duration::hours(4));
    }
}
