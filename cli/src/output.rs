//! Result rendering.

use std::fmt::Write as _;
use std::time::Duration;

use ratecache_common::{AsOf, Currency, RateTable};
use ratecache_fx::ServiceStats;
use ratecache_oxr::CurrencyInfo;
use serde::Serialize;
use serde_json::json;

/// Writes results to stdout as text or JSON.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    json: bool,
}

/// One lookup made by `watch`.
#[derive(Debug, Serialize)]
pub struct Observation {
    pub seq: u64,
    pub cache_hit: bool,
    pub latency_us: u64,
    pub base: Currency,
    pub rates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn table(&self, table: &RateTable) -> anyhow::Result<()> {
        println!("{}", self.render_table(table)?);
        Ok(())
    }

    pub fn rate(&self, base: &Currency, code: &str, as_of: AsOf, rate: f64) -> anyhow::Result<()> {
        println!("{}", self.render_rate(base, code, as_of, rate)?);
        Ok(())
    }

    pub fn currencies(&self, currencies: &[CurrencyInfo]) -> anyhow::Result<()> {
        println!("{}", self.render_currencies(currencies)?);
        Ok(())
    }

    pub fn observation(&self, observation: &Observation) -> anyhow::Result<()> {
        println!("{}", self.render_observation(observation)?);
        Ok(())
    }

    pub fn stats(&self, stats: &ServiceStats) -> anyhow::Result<()> {
        println!("{}", self.render_stats(stats)?);
        Ok(())
    }

    fn render_table(&self, table: &RateTable) -> anyhow::Result<String> {
        if self.json {
            return Ok(serde_json::to_string_pretty(table)?);
        }

        let mut out = String::new();
        match table.published_at {
            Some(published) => writeln!(
                out,
                "{} rates, published {} ({} currencies)",
                table.base,
                published.format("%Y-%m-%d %H:%M UTC"),
                table.len()
            )?,
            None => writeln!(out, "{} rates ({} currencies)", table.base, table.len())?,
        }
        for code in table.codes() {
            if let Some(rate) = table.rate(code) {
                writeln!(out, "{:<6}{:>16.6}", code, rate)?;
            }
        }
        Ok(out.trim_end().to_string())
    }

    fn render_rate(
        &self,
        base: &Currency,
        code: &str,
        as_of: AsOf,
        rate: f64,
    ) -> anyhow::Result<String> {
        let code = code.trim().to_uppercase();
        if self.json {
            let value = json!({
                "base": base,
                "code": code,
                "as_of": as_of.to_string(),
                "rate": rate,
            });
            return Ok(serde_json::to_string_pretty(&value)?);
        }
        Ok(format!("1 {} = {:.6} {} ({})", base, rate, code, as_of))
    }

    fn render_currencies(&self, currencies: &[CurrencyInfo]) -> anyhow::Result<String> {
        if self.json {
            return Ok(serde_json::to_string_pretty(currencies)?);
        }

        let mut out = String::new();
        for currency in currencies {
            writeln!(out, "{:<6}{}", currency.code, currency.name)?;
        }
        Ok(out.trim_end().to_string())
    }

    fn render_observation(&self, observation: &Observation) -> anyhow::Result<String> {
        if self.json {
            return Ok(serde_json::to_string(observation)?);
        }

        let source = if observation.cache_hit { "cache" } else { "fetch" };
        let latency = format_latency(Duration::from_micros(observation.latency_us));
        let detail = match (&observation.code, observation.rate) {
            (Some(code), Some(rate)) => format!("{} {:.6}", code, rate),
            _ => format!("{} rates", observation.rates),
        };
        Ok(format!(
            "#{:<4} {} {:<5} {:>10}  {}",
            observation.seq, observation.base, source, latency, detail
        ))
    }

    fn render_stats(&self, stats: &ServiceStats) -> anyhow::Result<String> {
        if self.json {
            return Ok(serde_json::to_string_pretty(stats)?);
        }

        Ok(format!(
            "hits {}  misses {}  hit rate {:.1}%  fetches {}  failures {}  cached {} ({} fresh)",
            stats.cache_hits,
            stats.cache_misses,
            stats.hit_rate() * 100.0,
            stats.fetches,
            stats.fetch_failures,
            stats.cache.total_entries,
            stats.cache.fresh_entries
        ))
    }
}

fn format_latency(latency: Duration) -> String {
    if latency < Duration::from_millis(1) {
        format!("{}us", latency.as_micros())
    } else {
        format!("{:.1}ms", latency.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ratecache_common::from_unix;
    use std::collections::HashMap;

    fn table() -> RateTable {
        RateTable::new(
            Currency::aud(),
            HashMap::from([("NZD".to_string(), 1.08), ("GBP".to_string(), 0.61)]),
        )
        .with_published_at(from_unix(1_341_936_000).unwrap())
    }

    #[test]
    fn test_text_table_is_sorted() {
        let text = Printer::new(false).render_table(&table()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "AUD rates, published 2012-07-10 16:00 UTC (2 currencies)");
        assert!(lines[1].starts_with("GBP"));
        assert!(lines[2].starts_with("NZD"));
        assert!(lines[2].ends_with("1.080000"));
    }

    #[test]
    fn test_json_table() {
        let text = Printer::new(true).render_table(&table()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["base"], "AUD");
        assert_eq!(value["rates"]["NZD"], 1.08);
    }

    #[test]
    fn test_rate_rendering() {
        let date = AsOf::Date(NaiveDate::from_ymd_opt(2012, 7, 10).unwrap());

        let text = Printer::new(false)
            .render_rate(&Currency::aud(), "nzd", date, 1.27)
            .unwrap();
        assert_eq!(text, "1 AUD = 1.270000 NZD (2012-07-10)");

        let text = Printer::new(true)
            .render_rate(&Currency::aud(), "nzd", AsOf::Latest, 1.08)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["code"], "NZD");
        assert_eq!(value["as_of"], "latest");
    }

    #[test]
    fn test_observation_rendering() {
        let observation = Observation {
            seq: 2,
            cache_hit: true,
            latency_us: 40,
            base: Currency::aud(),
            rates: 2,
            code: Some("NZD".to_string()),
            rate: Some(1.08),
        };

        let text = Printer::new(false).render_observation(&observation).unwrap();
        assert!(text.contains("cache"));
        assert!(text.contains("40us"));
        assert!(text.ends_with("NZD 1.080000"));
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(Duration::from_micros(250)), "250us");
        assert_eq!(format_latency(Duration::from_micros(12_500)), "12.5ms");
    }
}
