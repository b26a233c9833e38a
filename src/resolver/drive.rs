use url::Url;

use super::{
    CachePolicy, ClientContext, MediaRequest, MediaResolver, ResolveError, ResolvedMedia,
    TierSpec,
};

/// Desktop browser identity presented to the upstream provider
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const ACCEPT: &str = "image/webp,image/apng,image/*,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Resolver for drive-style storage: sized tiers go through the public
/// thumbnail endpoint, everything else through the direct view link.
#[derive(Debug, Clone)]
pub struct DriveResolver {
    base: Url,
}

impl DriveResolver {
    pub fn new(base_url: &str) -> Result<Self, ResolveError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| ResolveError::InvalidBaseUrl(base_url.to_string(), e.to_string()))?;

        if base.cannot_be_a_base() {
            return Err(ResolveError::InvalidBaseUrl(
                base_url.to_string(),
                "not a base url".to_string(),
            ));
        }

        // Url::join replaces the last segment unless the path ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segment: &str) -> Result<Url, ResolveError> {
        self.base
            .join(segment)
            .map_err(|e| ResolveError::InvalidBaseUrl(self.base.to_string(), e.to_string()))
    }

    fn browser_headers(&self) -> Vec<(String, String)> {
        [
            ("User-Agent", BROWSER_USER_AGENT.to_string()),
            ("Accept", ACCEPT.to_string()),
            ("Accept-Language", ACCEPT_LANGUAGE.to_string()),
            ("Referer", self.base.to_string()),
            ("Sec-Fetch-Dest", "image".to_string()),
            ("Sec-Fetch-Mode", "no-cors".to_string()),
            ("Sec-Fetch-Site", "cross-site".to_string()),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }
}

impl MediaResolver for DriveResolver {
    fn resolve(
        &self,
        request: &MediaRequest,
        client: &ClientContext,
    ) -> Result<ResolvedMedia, ResolveError> {
        if request.id.is_empty() {
            return Err(ResolveError::EmptyId);
        }

        let device = client.device_class();
        let tier = TierSpec::lookup(request.quality);
        let target = tier.target_for(device);

        let url = match target {
            Some(size) => {
                let mut url = self.endpoint("thumbnail")?;
                url.query_pairs_mut()
                    .append_pair("id", &request.id)
                    .append_pair("sz", &format!("w{}-h{}", size.width, size.height));
                url
            }
            None => {
                let mut url = self.endpoint("uc")?;
                url.query_pairs_mut()
                    .append_pair("export", "view")
                    .append_pair("id", &request.id);
                url
            }
        };

        Ok(ResolvedMedia {
            url,
            headers: self.browser_headers(),
            cache_policy: CachePolicy {
                max_age: tier.cache_max_age(),
            },
            device,
            quality: request.quality,
            target,
        })
    }
}
