use crate::{index::SharedIndex, resource::ResourceKind};
use prometheus_client::{
    collector::Collector,
    encoding::{DescriptorEncoder, EncodeMetric},
    metrics::{gauge::ConstGauge, MetricType},
    registry::Registry,
};

#[derive(Debug)]
struct Instrumented(SharedIndex);

pub fn register(reg: &mut Registry, index: SharedIndex) {
    reg.register_collector(Box::new(Instrumented(index)));
}

impl Collector for Instrumented {
    fn encode(&self, mut encoder: DescriptorEncoder<'_>) -> Result<(), std::fmt::Error> {
        let this = self.0.read();
        let config = this.configuration();

        let hosts_encoder = encoder.encode_descriptor(
            "hosts",
            "The number of hosts owned by a resource",
            None,
            MetricType::Gauge,
        )?;
        ConstGauge::new(config.host_count() as i64).encode(hosts_encoder)?;

        let mut resources_encoder = encoder.encode_descriptor(
            "resources",
            "The number of registered resources, including those that own no host",
            None,
            MetricType::Gauge,
        )?;
        for kind in [
            ResourceKind::Ingress,
            ResourceKind::VirtualServer,
            ResourceKind::VirtualServerRoute,
        ] {
            let labels = [("kind", kind.as_str())];
            let resources = ConstGauge::new(config.registered_count(kind) as i64);
            let resources_encoder = resources_encoder.encode_family(&labels)?;
            resources.encode(resources_encoder)?;
        }

        let problems_encoder = encoder.encode_descriptor(
            "problems",
            "The number of resources with an outstanding problem",
            None,
            MetricType::Gauge,
        )?;
        ConstGauge::new(config.problem_count() as i64).encode(problems_encoder)?;

        Ok(())
    }
}
