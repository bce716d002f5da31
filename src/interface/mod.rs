//! Interface descriptors: lookup, accessors and topic mutation.
//!
//! An application's `/<AppName>/interfaces` document holds one array per
//! [`Category`]. Each element (a descriptor) describes one logical endpoint.
//! [`Interface`] is a borrowed view of one descriptor together with the
//! [`Context`] that supplies overrides and key material for it.

mod endpoint;
mod topics;

use std::fmt;

use serde_json::Value;

use crate::config::{Field, OverrideChain};
use crate::msgbus::{self, TransportType};
use crate::value::{ArrayView, ConfigDocument, ConfigValue, ObjectView};
use crate::{Context, Error};

pub use endpoint::{EndpointSpec, SocketEndpoint, TcpAddress};
pub(crate) use topics::replace_topics;

/// The four kinds of interface an application can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Publisher,
    Subscriber,
    Server,
    Client,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Publisher,
        Category::Subscriber,
        Category::Server,
        Category::Client,
    ];

    /// Top-level key of this category's array in the interfaces document.
    pub fn array_key(self) -> &'static str {
        match self {
            Category::Publisher => "Publishers",
            Category::Subscriber => "Subscribers",
            Category::Server => "Servers",
            Category::Client => "Clients",
        }
    }

    /// Upper-case tag used in override variable names.
    pub fn env_tag(self) -> &'static str {
        match self {
            Category::Publisher => "PUBLISHER",
            Category::Subscriber => "SUBSCRIBER",
            Category::Server => "SERVER",
            Category::Client => "CLIENT",
        }
    }

    pub fn has_topics(self) -> bool {
        matches!(self, Category::Publisher | Category::Subscriber)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.array_key())
    }
}

/// Returns the category's array, which must exist and be non-empty.
pub(crate) fn category_array(
    doc: &ConfigDocument,
    category: Category,
) -> Result<ArrayView<'_>, Error> {
    let root = doc.root().as_object_for("interfaces")?;
    match root.get_opt(category.array_key()) {
        None | Some(ConfigValue::None) => Err(Error::EmptyCategory(category)),
        Some(value) => {
            let array = value.as_array_for(category.array_key())?;
            if array.is_empty() {
                Err(Error::EmptyCategory(category))
            } else {
                Ok(array)
            }
        }
    }
}

/// Linear scan for the first descriptor whose `Name` equals `name` exactly.
pub(crate) fn find_by_name<'a>(
    array: ArrayView<'a>,
    name: &str,
) -> Option<(usize, ObjectView<'a>)> {
    array.iter().enumerate().find_map(|(index, value)| {
        let obj = value.as_object()?;
        (obj.get_opt("Name")?.as_str()? == name).then_some((index, obj))
    })
}

/// An owned locator for a descriptor, usable across mutations of the
/// context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceRef {
    pub category: Category,
    pub name: String,
}

/// A borrowed view of one descriptor in a context's interfaces document.
#[derive(Debug, Clone, Copy)]
pub struct Interface<'a> {
    ctx: &'a Context,
    category: Category,
    index: usize,
    descriptor: ObjectView<'a>,
}

impl<'a> Interface<'a> {
    pub(crate) fn new(
        ctx: &'a Context,
        category: Category,
        index: usize,
        descriptor: ObjectView<'a>,
    ) -> Self {
        Self {
            ctx,
            category,
            index,
            descriptor,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Position of the descriptor within its category array.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn context(&self) -> &'a Context {
        self.ctx
    }

    pub fn descriptor(&self) -> ObjectView<'a> {
        self.descriptor
    }

    pub fn name(&self) -> Result<&'a str, Error> {
        Ok(self.descriptor.get_str("Name")?)
    }

    /// Raw value of any descriptor field.
    pub fn interface_value(&self, key: &str) -> Result<ConfigValue<'a>, Error> {
        Ok(self.descriptor.get(key)?)
    }

    pub fn to_ref(&self) -> Result<InterfaceRef, Error> {
        Ok(InterfaceRef {
            category: self.category,
            name: self.name()?.to_string(),
        })
    }

    fn overrides(&self) -> Result<OverrideChain, Error> {
        Ok(OverrideChain::for_descriptor(self.category, self.name()?))
    }

    /// `EndPoint` after applying environment overrides.
    pub fn endpoint(&self) -> Result<EndpointSpec, Error> {
        let resolved =
            self.overrides()?
                .resolve(Field::Endpoint, self.ctx.environment(), self.descriptor)?;
        EndpointSpec::from_resolved(resolved)
    }

    /// `Type` after applying environment overrides.
    pub fn transport_type(&self) -> Result<TransportType, Error> {
        let resolved =
            self.overrides()?
                .resolve(Field::Type, self.ctx.environment(), self.descriptor)?;
        let text = resolved
            .as_str()
            .ok_or_else(|| Error::malformed("Type", "expected a string"))?;
        text.parse()
    }

    /// The `Topics` list. Publishers and subscribers only.
    pub fn topics(&self) -> Result<Vec<&'a str>, Error> {
        if !self.category.has_topics() {
            return Err(Error::Unsupported(format!("topics on {}", self.category)));
        }
        Ok(self.descriptor.get_array("Topics")?.strings("Topics")?)
    }

    /// `AllowedClients`, falling back to the comma-separated `Clients`
    /// environment variable. Empty when neither is set.
    pub fn allowed_clients(&self) -> Result<Vec<String>, Error> {
        match self.descriptor.get_opt("AllowedClients") {
            Some(value) if !value.is_none() => Ok(value
                .as_array_for("AllowedClients")?
                .strings("AllowedClients")?
                .into_iter()
                .map(str::to_string)
                .collect()),
            _ => Ok(self
                .ctx
                .environment()
                .get_list("Clients")
                .unwrap_or_default()),
        }
    }

    /// Builds the message-bus transport configuration for this descriptor.
    pub fn msgbus_config(&self) -> Result<Value, Error> {
        msgbus::build(self)
    }
}
