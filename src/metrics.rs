use chrono::Utc;
use ideenergy::model::Measure;
use ideenergy::{Error, Provider};
use prometheus::{Encoder, Gauge, GaugeVec, TextEncoder};

lazy_static! {
    static ref INSTANT_POWER_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "ideenergy_instant_power",
            "instant demand reported by the meter (W, or litres in the last hour for water)",
        ),
        &["provider", "contract"],
    )
    .unwrap();
    static ref METER_READING_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "ideenergy_meter_reading",
            "accumulated meter counter (kWh, or litres for water)",
        ),
        &["provider", "contract"],
    )
    .unwrap();
    static ref LAST_MEASURE_GAUGE: Gauge = register_gauge!(opts!(
        "ideenergy_last_measure_timestamp_seconds",
        "unix time of the last successful measure",
    ))
    .unwrap();
}

/// Feed `measure` of `contract` to Prometheus metrics.
fn process_measure(provider: &str, contract: &str, measure: &Measure) {
    INSTANT_POWER_GAUGE
        .with_label_values(&[provider, contract])
        .set(measure.instant);
    METER_READING_GAUGE
        .with_label_values(&[provider, contract])
        .set(measure.accumulate as f64);
    LAST_MEASURE_GAUGE.set(Utc::now().timestamp() as f64);
}

/// Log in, read the meter and update Prometheus exporter registry.
pub async fn collect(provider: &dyn Provider, contract: &str) -> Result<Measure, Error> {
    provider.login().await?;
    log::debug!("reading meter, this may take up to a minute");
    let measure = provider.measure().await?;
    process_measure(provider.name(), contract, &measure);

    Ok(measure)
}

/// Read metrics from Prometheus exporter registry.
pub fn read() -> Result<String, Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(Error::FormatError))?;
    String::from_utf8(buffer).or(Err(Error::FormatError))
}

#[cfg(test)]
mod test {
    use ideenergy::model::Api;
    use ideenergy::{provider, ProviderId};

    #[tokio::test]
    async fn collect_updates_gauges() {
        let mock = provider::from_api(ProviderId::Mock, Api::new("", "", "")).unwrap();
        let measure = super::collect(mock.as_ref(), "123456789").await.unwrap();

        let metrics = super::read().unwrap();
        assert!(metrics.contains("ideenergy_instant_power"));
        assert!(metrics.contains("ideenergy_last_measure_timestamp_seconds"));
        assert!(metrics.contains(&format!(
            "ideenergy_meter_reading{{contract=\"123456789\",provider=\"mock\"}} {}",
            measure.accumulate
        )));
    }
}
