use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("HEARTFLOW_JUDGE_PROVIDER")
            && !provider.is_empty()
        {
            self.judge.provider = Some(provider);
        }

        if let Ok(model) = std::env::var("HEARTFLOW_JUDGE_MODEL")
            && !model.is_empty()
        {
            self.judge.model = model;
        }

        if let Ok(key) = std::env::var("HEARTFLOW_API_KEY")
            && !key.is_empty()
        {
            for endpoint in self.providers.values_mut() {
                if endpoint.api_key.is_none() {
                    endpoint.api_key = Some(key.clone());
                }
            }
        }

        if let Ok(raw) = std::env::var("HEARTFLOW_REPLY_THRESHOLD")
            && let Ok(threshold) = raw.parse::<f64>()
            && (0.0..=1.0).contains(&threshold)
        {
            self.judge.reply_threshold = threshold;
        }
    }
}
