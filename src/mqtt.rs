use ideenergy::model::Measure;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, Outgoing, QoS};
use std::time::Duration;

/// Topics and payloads published for `measure`.
pub fn messages(topic: &str, measure: &Measure) -> Vec<(String, String)> {
    vec![
        (format!("{}/accumulate", topic), measure.accumulate.to_string()),
        (format!("{}/instant", topic), measure.instant.to_string()),
    ]
}

/// Publish `measure` as retained messages and disconnect once the broker acknowledged them.
pub async fn publish(host: &str, port: u16, topic: &str, measure: &Measure) -> anyhow::Result<()> {
    let mut options = MqttOptions::new(format!("ideenergy-{}", std::process::id()), host, port);
    options.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(options, 10);
    let messages = messages(topic, measure);
    let mut pending = messages.len();
    for (topic, payload) in messages {
        log::debug!("publishing {} = {}", topic, payload);
        client
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .await?;
    }

    loop {
        match eventloop.poll().await? {
            Event::Incoming(Incoming::PubAck(_)) => {
                pending = pending.saturating_sub(1);
                if pending == 0 {
                    client.disconnect().await?;
                }
            }
            Event::Outgoing(Outgoing::Disconnect) => break,
            _ => {}
        }
    }

    log::info!("measure published to {}:{}", host, port);
    Ok(())
}

#[cfg(test)]
mod test {
    use ideenergy::model::Measure;

    #[test]
    fn messages() {
        let measure = Measure {
            accumulate: 36202,
            instant: 1234.5,
        };
        assert_eq!(
            vec![
                ("ideenergy/accumulate".to_string(), "36202".to_string()),
                ("ideenergy/instant".to_string(), "1234.5".to_string()),
            ],
            super::messages("ideenergy", &measure)
        );
    }
}
