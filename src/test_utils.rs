use crate::pool::proxy::{AnonymityLevel, Proxy, ProxyPool, ProxyProtocol};

pub fn sample_proxy(id: &str, region: &str) -> Proxy {
    Proxy {
        id: id.to_string(),
        host: "10.0.0.1".to_string(),
        port: 8080,
        protocol: ProxyProtocol::Http,
        auth: None,
        region: region.to_string(),
        country: "US".to_string(),
        city: "Ashburn".to_string(),
        cost_per_request: 0.001,
        cost_per_gb: 0.5,
        max_concurrency: 10,
        current_load: 0,
        success_count: 0,
        fail_count: 0,
        latency_ms: None,
        healthy: true,
        anonymity: AnonymityLevel::Elite,
        provider: "acme".to_string(),
        last_check: None,
    }
}

pub fn pool_with_loads(name: &str, region: &str, loads: &[u32]) -> ProxyPool {
    let proxies = loads
        .iter()
        .enumerate()
        .map(|(i, load)| {
            let mut proxy = sample_proxy(&format!("{}-{}", name, i), region);
            proxy.current_load = *load;
            proxy
        })
        .collect::<Vec<_>>();
    let cost = if proxies.is_empty() {
        0.0
    } else {
        proxies.iter().map(|p| p.cost_per_request).sum::<f64>() / proxies.len() as f64
    };
    ProxyPool {
        name: name.to_string(),
        region: region.to_string(),
        proxies,
        cost_per_request: cost,
    }
}
