use sweetshop_auth::{CommandAuthorization, Permission};

/// Small helper wrapper to associate required permissions with a request.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CmdAuth<C> {
    pub fn new(inner: C, required: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            inner,
            required: required.into_iter().collect(),
        }
    }
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}
