//! User-defined services and controller state subscriptions.

use devapi_proto::{
    ExecuteServiceArgument, ExecuteServiceRequest, ListEntitiesServicesArgument,
    ListEntitiesServicesResponse, ServiceArgType,
};

use crate::entity::fnv1_hash;

/// A typed argument value passed to a service callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceArgValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
}

impl ServiceArgValue {
    /// Pick the member of `arg` that matches `arg_type`.
    pub fn from_argument(arg_type: ServiceArgType, arg: &ExecuteServiceArgument) -> Self {
        match arg_type {
            ServiceArgType::Bool => ServiceArgValue::Bool(arg.bool_),
            ServiceArgType::Int => ServiceArgValue::Int(arg.int_),
            ServiceArgType::Float => ServiceArgValue::Float(arg.float_),
            ServiceArgType::String => ServiceArgValue::String(arg.string_.clone()),
        }
    }
}

/// Declared service argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceArg {
    pub name: String,
    pub arg_type: ServiceArgType,
}

impl ServiceArg {
    pub fn new(name: impl Into<String>, arg_type: ServiceArgType) -> Self {
        ServiceArg {
            name: name.into(),
            arg_type,
        }
    }
}

type ServiceCallback = Box<dyn Fn(&[ServiceArgValue]) + Send + Sync>;

/// A service the controller can invoke on the device.
pub struct UserService {
    name: String,
    key: u32,
    args: Vec<ServiceArg>,
    callback: ServiceCallback,
}

impl UserService {
    /// Declare a service. The key is the FNV-1 hash of `name`.
    pub fn new<F>(name: impl Into<String>, args: Vec<ServiceArg>, callback: F) -> Self
    where
        F: Fn(&[ServiceArgValue]) + Send + Sync + 'static,
    {
        let name = name.into();
        let key = fnv1_hash(&name);
        UserService {
            name,
            key,
            args,
            callback: Box::new(callback),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn args(&self) -> &[ServiceArg] {
        &self.args
    }

    /// Descriptor sent during the describe pass.
    pub fn to_list_response(&self) -> ListEntitiesServicesResponse {
        ListEntitiesServicesResponse {
            name: self.name.clone(),
            key: self.key,
            args: self
                .args
                .iter()
                .map(|a| ListEntitiesServicesArgument {
                    name: a.name.clone(),
                    arg_type: a.arg_type,
                })
                .collect(),
        }
    }

    /// Run the callback if `req` targets this service with the right
    /// number of arguments. Returns whether it ran.
    pub fn execute(&self, req: &ExecuteServiceRequest) -> bool {
        if req.key != self.key || req.args.len() != self.args.len() {
            return false;
        }
        let values: Vec<ServiceArgValue> = self
            .args
            .iter()
            .zip(&req.args)
            .map(|(decl, arg)| ServiceArgValue::from_argument(decl.arg_type, arg))
            .collect();
        (self.callback)(&values);
        true
    }
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

type StateCallback = Box<dyn Fn(&str) + Send + Sync>;

/// A controller entity whose state the device follows.
pub struct HomeAssistantStateSubscription {
    pub entity_id: String,
    callback: StateCallback,
}

impl HomeAssistantStateSubscription {
    pub fn new<F>(entity_id: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        HomeAssistantStateSubscription {
            entity_id: entity_id.into(),
            callback: Box::new(callback),
        }
    }

    /// Deliver a new state.
    pub fn notify(&self, state: &str) {
        (self.callback)(state);
    }
}

impl std::fmt::Debug for HomeAssistantStateSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeAssistantStateSubscription")
            .field("entity_id", &self.entity_id)
            .finish_non_exhaustive()
    }
}
