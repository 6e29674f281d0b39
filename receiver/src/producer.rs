use crate::config::{AuthMechanism, ProducerConfig};
use crate::errors::{Error, Result};
use crate::metrics::{MESSAGES_PUBLISHED_TOTAL, PUBLISH_LATENCY_SECONDS};
use async_trait::async_trait;
use chrono::Utc;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder, Credentials, SaslConfig};
use rskafka::record::Record;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Low-level broker capability the publisher is built on.
#[async_trait]
pub trait MessageWriter: Send + Sync {
    async fn write(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Kafka writer backed by `rskafka`, producing to a fixed partition of each topic.
pub struct KafkaWriter {
    client: Client,
    partition: i32,
    publish_timeout: Duration,
    partitions: Mutex<HashMap<String, Arc<PartitionClient>>>,
}

impl KafkaWriter {
    pub async fn connect(config: &ProducerConfig) -> Result<Self> {
        info!("Connecting to Kafka brokers {:?}", config.brokers);

        let mut builder = ClientBuilder::new(config.brokers.clone());
        if let Some(sasl) = sasl_config(config) {
            builder = builder.sasl_config(sasl);
        }
        let client = builder.build().await?;

        info!("Kafka connection established");
        Ok(Self {
            client,
            partition: config.partition,
            publish_timeout: config.publish_timeout,
            partitions: Mutex::new(HashMap::new()),
        })
    }

    async fn partition_client(&self, topic: &str) -> Result<Arc<PartitionClient>> {
        let mut partitions = self.partitions.lock().await;
        if let Some(client) = partitions.get(topic) {
            return Ok(Arc::clone(client));
        }

        debug!("Creating partition client for {}/{}", topic, self.partition);
        let client = Arc::new(
            self.client
                .partition_client(topic.to_string(), self.partition, UnknownTopicHandling::Error)
                .await?,
        );
        partitions.insert(topic.to_string(), Arc::clone(&client));
        Ok(client)
    }
}

#[async_trait]
impl MessageWriter for KafkaWriter {
    async fn write(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let produce = async {
            let partition = self.partition_client(topic).await?;
            let record = Record {
                key: None,
                value: Some(payload),
                headers: BTreeMap::new(),
                timestamp: Utc::now(),
            };
            partition
                .produce(vec![record], Compression::NoCompression)
                .await?;
            Ok::<(), Error>(())
        };

        match tokio::time::timeout(self.publish_timeout, produce).await {
            Ok(result) => result,
            Err(_) => {
                // Drop the cached client; the connection may be wedged.
                self.partitions.lock().await.remove(topic);
                Err(Error::PublishTimeout {
                    topic: topic.to_string(),
                    timeout_ms: self.publish_timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.partitions.lock().await.clear();
        info!("Kafka writer closed");
        Ok(())
    }
}

fn sasl_config(config: &ProducerConfig) -> Option<SaslConfig> {
    let credentials = config
        .credentials
        .as_ref()
        .map(|c| Credentials::new(c.username.clone(), c.password.clone()));

    match (config.auth_mechanism, credentials) {
        (AuthMechanism::None, _) => None,
        (AuthMechanism::Plain, None) => {
            warn!("PLAIN auth selected without credentials, connecting unauthenticated");
            None
        }
        (AuthMechanism::Plain, Some(c)) => Some(SaslConfig::Plain(c)),
        (AuthMechanism::ScramSha256, Some(c)) => Some(SaslConfig::ScramSha256(c)),
        (AuthMechanism::ScramSha512, Some(c)) => Some(SaslConfig::ScramSha512(c)),
        // Rejected while loading the config.
        (AuthMechanism::ScramSha256 | AuthMechanism::ScramSha512, None) => None,
    }
}

/// Owns the broker connection and publishes serialized messages.
pub struct BrokerPublisher<W> {
    writer: W,
    status_topic: String,
    own_name: String,
}

impl BrokerPublisher<KafkaWriter> {
    /// Connects to Kafka and runs the startup self-test.
    pub async fn connect(config: &ProducerConfig) -> Result<Self> {
        info!("Initializing Kafka producer");
        let writer = KafkaWriter::connect(config).await?;
        Self::start(writer, config).await
    }
}

impl<W: MessageWriter> BrokerPublisher<W> {
    /// Wraps an existing writer and publishes the "is alive" status message.
    ///
    /// A failure here means the broker is unreachable or misconfigured.
    pub async fn start(writer: W, config: &ProducerConfig) -> Result<Self> {
        let publisher = Self {
            writer,
            status_topic: config.status_topic.clone(),
            own_name: config.own_name.clone(),
        };

        let status = format!("{} is alive", publisher.own_name);
        publisher
            .writer
            .write(&publisher.status_topic, status.into_bytes())
            .await
            .map_err(|e| Error::SelfTest(Box::new(e)))?;

        info!(
            "Self-test message published to {}",
            publisher.status_topic
        );
        Ok(publisher)
    }

    pub async fn publish(&self, message: Vec<u8>, topic: &str) -> Result<()> {
        let start = Instant::now();
        self.writer.write(topic, message).await?;

        PUBLISH_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());
        MESSAGES_PUBLISHED_TOTAL.inc();
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.writer.close().await
    }

    pub fn own_name(&self) -> &str {
        &self.own_name
    }
}
