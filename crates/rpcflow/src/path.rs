use std::fmt;

use crate::error::RpcPathError;

/// A parsed gRPC method path: `{package}.{service}/{method}`
///
/// Example: `demo.EchoService/Echo`
/// - `package`: `demo`
/// - `service`: `EchoService`
/// - `method`: `Echo`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrpcPath {
    pub package: String,
    pub service: String,
    pub method: String,
}

impl GrpcPath {
    /// Parse a gRPC path string.
    ///
    /// Expected format: `{package}.{service}/{method}`
    pub fn parse(path: &str) -> Result<Self, RpcPathError> {
        let path = path.strip_prefix('/').unwrap_or(path);

        let (service_path, method) = path
            .rsplit_once('/')
            .ok_or_else(|| RpcPathError::Invalid(format!("gRPC path must contain '/': '{path}'")))?;

        Self::from_parts(service_path, method)
    }

    /// Build a path from a full service name (`{package}.{service}`) and a method.
    pub fn from_parts(full_service: &str, method: &str) -> Result<Self, RpcPathError> {
        let (package, service) = full_service.rsplit_once('.').ok_or_else(|| {
            RpcPathError::Invalid(format!(
                "service path must contain package.service: '{full_service}'"
            ))
        })?;

        if package.is_empty() || service.is_empty() || method.is_empty() || method.contains('/') {
            return Err(RpcPathError::Invalid(format!(
                "package, service, and method must all be non-empty: '{full_service}/{method}'"
            )));
        }

        Ok(GrpcPath {
            package: package.to_owned(),
            service: service.to_owned(),
            method: method.to_owned(),
        })
    }

    /// Returns the full service name: `{package}.{service}`
    pub fn full_service(&self) -> String {
        format!("{}.{}", self.package, self.service)
    }

    /// Returns the full gRPC path: `{package}.{service}/{method}`
    pub fn full_path(&self) -> String {
        format!("{}.{}/{}", self.package, self.service, self.method)
    }
}

impl fmt::Display for GrpcPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}/{}", self.package, self.service, self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grpc_path_parse() {
        let path = GrpcPath::parse("demo.EchoService/Echo").unwrap();
        assert_eq!(path.package, "demo");
        assert_eq!(path.service, "EchoService");
        assert_eq!(path.method, "Echo");
        assert_eq!(path.full_service(), "demo.EchoService");
        assert_eq!(path.full_path(), "demo.EchoService/Echo");
        assert_eq!(path.to_string(), "demo.EchoService/Echo");
    }

    #[test]
    fn test_grpc_path_with_leading_slash() {
        let path = GrpcPath::parse("/demo.EchoService/Echo").unwrap();
        assert_eq!(path.package, "demo");
        assert_eq!(path.service, "EchoService");
        assert_eq!(path.method, "Echo");
    }

    #[test]
    fn test_grpc_path_nested_package() {
        let path = GrpcPath::parse("com.example.demo.EchoService/Echo").unwrap();
        assert_eq!(path.package, "com.example.demo");
        assert_eq!(path.service, "EchoService");
    }

    #[test]
    fn test_from_parts() {
        let path = GrpcPath::from_parts("demo.EchoService", "Chat").unwrap();
        assert_eq!(path.full_path(), "demo.EchoService/Chat");
    }

    #[test]
    fn test_grpc_path_missing_method() {
        assert!(GrpcPath::parse("demo.EchoService").is_err());
        assert!(GrpcPath::parse("demo.EchoService/").is_err());
    }

    #[test]
    fn test_grpc_path_missing_package() {
        assert!(GrpcPath::parse("EchoService/Echo").is_err());
    }
}
