//! Build server URLs

use aibuild_core::output::BUILD_FOLDER;
use aibuild_core::BuildServerConfig;
use url::Url;

/// Build endpoint on the build server
pub const BUILD_PATH: &str = "/buildserver/build-all-from-zip-async";

/// Endpoint the build server posts results back to
pub const RECEIVE_BUILD_PATH: &str = "/ode2/receivebuild";

/// `http://<callback host>/ode2/receivebuild/<token>/build/<target>`
pub fn callback_url(config: &BuildServerConfig, token: &str, target: &str) -> String {
    format!(
        "http://{}{}/{}/{}/{}",
        config.callback_host(),
        RECEIVE_BUILD_PATH,
        token,
        BUILD_FOLDER,
        target
    )
}

/// Build request URL; query values are form-encoded
pub fn build_url(config: &BuildServerConfig, email: &str, callback: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("http://{}{}", config.host, BUILD_PATH))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("uname", email);
        if config.send_git_version {
            query.append_pair("gitBuildVersion", &config.git_build_version);
        }
        query.append_pair("callback", callback);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_url() {
        let mut config = BuildServerConfig::default();
        assert_eq!(
            callback_url(&config, "abc.def", "apk"),
            "http://localhost:8888/ode2/receivebuild/abc.def/build/apk"
        );

        config.production = true;
        config.appengine_host = "ai2.example.org".into();
        assert_eq!(
            callback_url(&config, "t", "aab"),
            "http://ai2.example.org/ode2/receivebuild/t/build/aab"
        );
    }

    #[test]
    fn test_build_url() {
        let mut config = BuildServerConfig::default();
        config.host = "build.example.org:9990".into();
        config.git_build_version = "v1 beta".into();

        let url = build_url(&config, "me+you@example.org", "http://h/x?y=1").unwrap();
        assert_eq!(
            url.as_str(),
            "http://build.example.org:9990/buildserver/build-all-from-zip-async\
             ?uname=me%2Byou%40example.org&gitBuildVersion=v1+beta\
             &callback=http%3A%2F%2Fh%2Fx%3Fy%3D1"
        );

        config.send_git_version = false;
        let url = build_url(&config, "me@example.org", "cb").unwrap();
        assert_eq!(url.query(), Some("uname=me%40example.org&callback=cb"));
    }
}
