//! Per-request context handed through middleware to route handlers.

use std::collections::HashMap;

use crate::Request;

/// Path parameters captured by the matched route, already percent-decoded.
#[derive(Default, Debug, Clone)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, value: String) {
        self.map.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A request plus whatever the router learned while matching it.
pub struct Context {
    request: Request,
    params: PathParams,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            params: PathParams::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }
}
