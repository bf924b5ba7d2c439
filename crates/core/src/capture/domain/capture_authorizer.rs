#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Authorized,
    Denied,
    Restricted,
}

/// Domain interface for the platform's camera permission prompt.
pub trait CaptureAuthorizer: Send + Sync {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Prompts the user. Blocks until they answer; returns whether access was granted.
    fn request_access(&self) -> bool;
}
