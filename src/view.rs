pub const DEFAULT_NAMESPACE: &str = "api/v1";
pub const DEFAULT_VIEW: &str = "CAPACITY-SCHEDULER";
pub const DEFAULT_INSTANCE: &str = "AUTO_CS_INSTANCE";

const RESOURCE_SUFFIX: [&str; 3] = ["resources", "scheduler", "configuration"];

/// Address of one capacity-scheduler view instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLocation {
    pub namespace: String,
    pub view: String,
    /// Empty when the deployment does not version its views.
    pub version: String,
    pub instance: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewPathError {
    pub path: String,
}

impl std::fmt::Display for ViewPathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "not a view path (expected /views/<view>[/<version>]/<instance>): {}",
            self.path
        )
    }
}

impl std::error::Error for ViewPathError {}

impl ViewLocation {
    pub fn new(
        namespace: impl Into<String>,
        view: impl Into<String>,
        version: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            view: view.into(),
            version: version.into(),
            instance: instance.into(),
        }
    }

    /// Parses the path the view is served from, e.g.
    /// `/views/CAPACITY-SCHEDULER/1.0.0/AUTO_CS_INSTANCE/`.
    ///
    /// With only two segments after `views` the version is taken as absent.
    pub fn from_browser_path(path: &str) -> Result<Self, ViewPathError> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).skip(1).collect();
        let (view, version, instance) = match parts.as_slice() {
            [view, instance] => (*view, "", *instance),
            [view, version, instance, ..] => (*view, *version, *instance),
            _ => {
                return Err(ViewPathError {
                    path: path.to_string(),
                });
            }
        };
        Ok(Self::new(DEFAULT_NAMESPACE, view, version, instance))
    }

    /// Path of the scheduler configuration resource, always with a leading `/`.
    pub fn base_path(&self) -> String {
        let namespace = self.namespace.trim_matches('/');
        let mut segments = vec![
            namespace,
            "views",
            self.view.as_str(),
            "versions",
            self.version.as_str(),
            "instances",
            self.instance.as_str(),
        ];
        segments.extend(RESOURCE_SUFFIX);
        format!("/{}", segments.join("/"))
    }

    pub fn base_url(&self, origin: &str) -> String {
        format!("{}{}", origin.trim_end_matches('/'), self.base_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_joins_all_segments() {
        let loc = ViewLocation::new("api/v1", "CAPACITY-SCHEDULER", "1.0.0", "cs");
        assert_eq!(
            loc.base_path(),
            "/api/v1/views/CAPACITY-SCHEDULER/versions/1.0.0/instances/cs/resources/scheduler/configuration"
        );
        assert_eq!(
            loc.base_url("http://ambari:8080/"),
            "http://ambari:8080/api/v1/views/CAPACITY-SCHEDULER/versions/1.0.0/instances/cs/resources/scheduler/configuration"
        );
    }

    #[test]
    fn parses_browser_path_with_version() {
        let loc =
            ViewLocation::from_browser_path("/views/CAPACITY-SCHEDULER/1.0.0/AUTO_CS_INSTANCE/")
                .unwrap();
        assert_eq!(loc.view, "CAPACITY-SCHEDULER");
        assert_eq!(loc.version, "1.0.0");
        assert_eq!(loc.instance, "AUTO_CS_INSTANCE");
        assert_eq!(loc.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn two_segments_mean_no_version() {
        let loc = ViewLocation::from_browser_path("/views/CAPACITY-SCHEDULER/cs1").unwrap();
        assert_eq!(loc.version, "");
        assert_eq!(loc.instance, "cs1");
        assert!(loc.base_path().contains("/versions//instances/cs1/"));
    }

    #[test]
    fn rejects_short_paths() {
        let err = ViewLocation::from_browser_path("/views/CAPACITY-SCHEDULER").unwrap_err();
        assert!(err.to_string().contains("/views/CAPACITY-SCHEDULER"));
        assert!(ViewLocation::from_browser_path("").is_err());
    }
}
