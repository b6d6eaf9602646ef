//! The `$ui.pageContext` host object.
//!
//! Accessor names are matched case-insensitively, so `user.firstName()` and
//! `user.firstname()` read the same field. A field the host did not supply
//! reads as `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::display;
use crate::ExprError;

/// Page the configuration is being evaluated for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageContext {
    pub user: Option<UserContext>,
    pub page_system_name: Option<String>,
    pub portal_system_name: Option<String>,
    pub locale: Option<String>,
    pub currency: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// Signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserContext {
    #[serde(alias = "userid")]
    pub user_id: Option<String>,
    pub username: Option<String>,
    #[serde(alias = "firstname")]
    pub first_name: Option<String>,
    #[serde(alias = "lastname")]
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Read a zero-argument accessor such as `user.userid` or `locale`.
pub(crate) fn read_accessor(page: &PageContext, name: &str) -> Result<Value, ExprError> {
    let user = page.user.as_ref();
    let text = |s: Option<&String>| s.map_or(Value::Null, |s| Value::String(s.clone()));

    Ok(match name.to_ascii_lowercase().as_str() {
        "user.userid" => text(user.and_then(|u| u.user_id.as_ref())),
        "user.username" => text(user.and_then(|u| u.username.as_ref())),
        "user.firstname" => text(user.and_then(|u| u.first_name.as_ref())),
        "user.lastname" => text(user.and_then(|u| u.last_name.as_ref())),
        "user.email" => text(user.and_then(|u| u.email.as_ref())),
        "pagesystemname" => text(page.page_system_name.as_ref()),
        "portalsystemname" => text(page.portal_system_name.as_ref()),
        "locale" => text(page.locale.as_ref()),
        "currency" => text(page.currency.as_ref()),
        "permissions" => page
            .permissions
            .as_ref()
            .map_or(Value::Null, |p| Value::Array(p.iter().cloned().map(Value::String).collect())),
        _ => return Err(ExprError::UnknownFunction(format!("$ui.pageContext.{name}"))),
    })
}

/// Call `$ui.pageContext.<name>(args)`.
pub(crate) fn call(page: &PageContext, name: &str, args: &[Value]) -> Result<Value, ExprError> {
    if name.eq_ignore_ascii_case("hasPermission") {
        let [permission] = args else {
            return Err(ExprError::argument("$ui.pageContext.hasPermission", "expects one permission name"));
        };
        let permission = display(permission);
        let granted = page.permissions.as_ref().is_some_and(|p| p.iter().any(|g| g.eq_ignore_ascii_case(&permission)));
        return Ok(Value::Bool(granted));
    }

    let value = read_accessor(page, name)?;
    if !args.is_empty() {
        return Err(ExprError::argument(&format!("$ui.pageContext.{name}"), "takes no arguments"));
    }
    Ok(value)
}
