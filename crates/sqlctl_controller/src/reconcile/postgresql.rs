//! Reconcilers for the six Postgres kinds: Database, Role, Schema, Grant,
//! DefaultPrivileges, ExtensionInstallation. Each follows the same
//! Observe/Create/Update/Delete shape from `SPEC_FULL.md` 4.5, wired to
//! `crate::external::postgresql` and `crate::compose::postgresql`.

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use sqlctl_core::{ConnectionDetails, Error, Result};
use sqlctl_resources::postgresql::{
    Database, DefaultPrivileges, ExtensionInstallation, Grant, Role, Schema,
};
use sqlctl_resources::status::ConditionReason;

use crate::compose::postgresql::GrantTarget;
use crate::connector::{Connector, Dialect};
use crate::credentials::ProviderConfigRef;
use crate::external::postgresql as ext;
use crate::reconcile::{
    conditions_json, namespace_of, patch_status, read_connection_details, requeue_after,
    resolve_principal_password, resource_ref, run_finalized, usage_name, write_connection_details,
    Context,
};
use crate::reference;

const DATABASE_FINALIZER: &str = "postgresql.sql.internal/database";
const ROLE_FINALIZER: &str = "postgresql.sql.internal/role";
const SCHEMA_FINALIZER: &str = "postgresql.sql.internal/schema";
const GRANT_FINALIZER: &str = "postgresql.sql.internal/grant";
const DEFAULT_PRIVILEGES_FINALIZER: &str = "postgresql.sql.internal/defaultprivileges";
const EXTENSION_FINALIZER: &str = "postgresql.sql.internal/extensioninstallation";

fn provider_ref(namespace: &str, provider_config_ref: &str) -> ProviderConfigRef {
    ProviderConfigRef::Namespaced { namespace: namespace.to_string(), name: provider_config_ref.to_string() }
}

pub fn error_policy<K>(_obj: Arc<K>, error: &Error, _ctx: Arc<Context>) -> Action {
    requeue_after(error)
}

// ---------------------------------------------------------------- Database

pub async fn reconcile_database(obj: Arc<Database>, ctx: Arc<Context>) -> Result<Action> {
    let _permit = ctx.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
    let namespace = namespace_of(obj.as_ref())?;
    let client = ctx.client.clone();
    run_finalized(
        client,
        &namespace,
        DATABASE_FINALIZER,
        obj,
        {
            let ctx = ctx.clone();
            move |obj| apply_database(obj, ctx)
        },
        move |obj| cleanup_database(obj, ctx),
    )
    .await
}

async fn apply_database(obj: Arc<Database>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("database", &name),
            &resource_ref("database", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            None,
        )
        .await?;
    let mut connection = connected.connection;

    let observed = ext::observe_database(connection.as_mut(), &name).await?;
    if !observed.exists {
        ext::create_database(connection.as_mut(), &name).await?;
    }

    patch_status::<Database>(
        &ctx.client,
        &namespace,
        &name,
        serde_json::json!({
            "atProvider": { "exists": true },
            "conditions": conditions_json(true, ConditionReason::Available),
        }),
    )
    .await?;
    Ok(Action::requeue(ctx.config.poll_interval))
}

async fn cleanup_database(obj: Arc<Database>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("database", &name),
            &resource_ref("database", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            None,
        )
        .await?;
    ext::delete_database(connected.connection.as_mut(), &name).await?;
    Ok(Action::await_change())
}

// -------------------------------------------------------------------- Role

pub async fn reconcile_role(obj: Arc<Role>, ctx: Arc<Context>) -> Result<Action> {
    let _permit = ctx.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
    let namespace = namespace_of(obj.as_ref())?;
    let client = ctx.client.clone();
    run_finalized(
        client,
        &namespace,
        ROLE_FINALIZER,
        obj,
        {
            let ctx = ctx.clone();
            move |obj| apply_role(obj, ctx)
        },
        move |obj| cleanup_role(obj, ctx),
    )
    .await
}

async fn apply_role(obj: Arc<Role>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("role", &name),
            &resource_ref("role", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            None,
        )
        .await?;
    let mut connection = connected.connection;

    let existing_details = read_connection_details(ctx.object_store.as_ref(), &namespace, &name).await?;
    let secret_ref = obj
        .spec
        .password_secret_ref
        .as_ref()
        .map(|r| (r.namespace.as_str(), r.name.as_str(), r.key.as_str()));
    let spec_password =
        resolve_principal_password(ctx.object_store.as_ref(), secret_ref, existing_details.as_ref()).await?;

    let observed = ext::observe_role(connection.as_mut(), &name).await?;
    if !observed.exists {
        ext::create_role(connection.as_mut(), &name, Some(spec_password.as_str()), obj.spec.connection_limit).await?;
    } else if let Some(details) = &existing_details {
        let connection_details_password =
            details.get("password").map(|v| String::from_utf8_lossy(v).into_owned()).unwrap_or_default();
        let created_at = obj.meta().creation_timestamp.as_ref().map(|t| t.0).unwrap_or_else(chrono::Utc::now);
        ext::update_role_password(
            connection.as_mut(),
            &name,
            &spec_password,
            &connection_details_password,
            created_at,
            None,
        )
        .await?;
    }

    write_connection_details(
        ctx.object_store.as_ref(),
        &namespace,
        &name,
        &ConnectionDetails {
            username: name.clone(),
            password: spec_password,
            endpoint: connected.credentials.endpoint.clone(),
            port: connected.credentials.port,
        },
    )
    .await?;

    patch_status::<Role>(
        &ctx.client,
        &namespace,
        &name,
        serde_json::json!({
            "atProvider": { "exists": true },
            "conditions": conditions_json(true, ConditionReason::Available),
        }),
    )
    .await?;
    Ok(Action::requeue(ctx.config.poll_interval))
}

async fn cleanup_role(obj: Arc<Role>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("role", &name),
            &resource_ref("role", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            None,
        )
        .await?;
    ext::delete_role(connected.connection.as_mut(), &name).await?;
    Ok(Action::await_change())
}

// ------------------------------------------------------------------ Schema

pub async fn reconcile_schema(obj: Arc<Schema>, ctx: Arc<Context>) -> Result<Action> {
    let _permit = ctx.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
    let namespace = namespace_of(obj.as_ref())?;
    let client = ctx.client.clone();
    run_finalized(
        client,
        &namespace,
        SCHEMA_FINALIZER,
        obj,
        {
            let ctx = ctx.clone();
            move |obj| apply_schema(obj, ctx)
        },
        move |obj| cleanup_schema(obj, ctx),
    )
    .await
}

async fn apply_schema(obj: Arc<Schema>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let database = reference::resolve::<Database>(&ctx.client, &namespace, &obj.spec.database).await?;
    let owner = reference::resolve::<Role>(&ctx.client, &namespace, &obj.spec.owner).await?;

    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("schema", &name),
            &resource_ref("schema", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            Some(database.as_str()),
        )
        .await?;
    let mut connection = connected.connection;

    match ext::observe_schema(connection.as_mut(), &name).await {
        Ok(current_owner) => {
            if current_owner.as_deref() != Some(owner.as_str()) {
                ext::update_schema_owner(connection.as_mut(), &name, &owner).await?;
            }
        }
        Err(Error::NoRows) => {
            ext::create_schema(connection.as_mut(), &name, &owner, obj.spec.revoke_public_on_schema).await?;
        }
        Err(e) => return Err(e),
    }

    patch_status::<Schema>(
        &ctx.client,
        &namespace,
        &name,
        serde_json::json!({
            "atProvider": { "exists": true, "owner": owner },
            "conditions": conditions_json(true, ConditionReason::Available),
        }),
    )
    .await?;
    Ok(Action::requeue(ctx.config.poll_interval))
}

async fn cleanup_schema(obj: Arc<Schema>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let database = reference::resolve::<Database>(&ctx.client, &namespace, &obj.spec.database).await?;
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("schema", &name),
            &resource_ref("schema", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            Some(database.as_str()),
        )
        .await?;
    ext::delete_schema(connected.connection.as_mut(), &name).await?;
    Ok(Action::await_change())
}

// ------------------------------------------------------------------- Grant

fn grant_target<'a>(database: &'a str, schema: Option<&'a str>, member_of: Option<&'a str>) -> Result<GrantTarget<'a>> {
    match (schema, member_of) {
        (Some(schema), None) => Ok(GrantTarget::Schema { database, schema }),
        (None, Some(member_of)) => Ok(GrantTarget::RoleMember { member_of }),
        (None, None) => Ok(GrantTarget::Database { database }),
        (Some(_), Some(_)) => Err(Error::GrantTypeAmbiguous(
            "grant spec set both schema and memberOf".to_string(),
        )),
    }
}

pub async fn reconcile_grant(obj: Arc<Grant>, ctx: Arc<Context>) -> Result<Action> {
    let _permit = ctx.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
    let namespace = namespace_of(obj.as_ref())?;
    let client = ctx.client.clone();
    run_finalized(
        client,
        &namespace,
        GRANT_FINALIZER,
        obj,
        {
            let ctx = ctx.clone();
            move |obj| apply_grant(obj, ctx)
        },
        move |obj| cleanup_grant(obj, ctx),
    )
    .await
}

async fn apply_grant(obj: Arc<Grant>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let role = reference::resolve::<Role>(&ctx.client, &namespace, &obj.spec.role).await?;

    let database = match &obj.spec.database {
        Some(r) => Some(reference::resolve::<Database>(&ctx.client, &namespace, r).await?),
        None => None,
    };
    let schema = match &obj.spec.schema {
        Some(r) => Some(reference::resolve::<Schema>(&ctx.client, &namespace, r).await?),
        None => None,
    };
    let member_of = match &obj.spec.member_of {
        Some(r) => Some(reference::resolve::<Role>(&ctx.client, &namespace, r).await?),
        None => None,
    };
    if database.is_some() as u8 + member_of.is_some() as u8 > 1 {
        return Err(Error::GrantTypeAmbiguous("grant spec set both database and memberOf".to_string()));
    }
    let database = database.unwrap_or_default();
    let target = grant_target(&database, schema.as_deref(), member_of.as_deref())?;
    let with_grant_option = matches!(&obj.spec.with_option, Some(sqlctl_resources::common::WithOption::Grant));

    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("grant", &name),
            &resource_ref("grant", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            if database.is_empty() { None } else { Some(database.as_str()) },
        )
        .await?;
    let mut connection = connected.connection;

    let observed = ext::read_grant_privileges(connection.as_mut(), &role, &target).await?;
    ext::reconcile_grant(connection.as_mut(), &role, &target, &obj.spec.privileges, with_grant_option, &observed)
        .await?;

    patch_status::<Grant>(
        &ctx.client,
        &namespace,
        &name,
        serde_json::json!({
            "atProvider": { "privileges": obj.spec.privileges },
            "conditions": conditions_json(true, ConditionReason::Available),
        }),
    )
    .await?;
    // Grants are re-checked on a fixed cadence regardless of other kinds'
    // poll interval (`SPEC_FULL.md` section 5).
    Ok(Action::requeue(std::time::Duration::from_secs(600)))
}

async fn cleanup_grant(obj: Arc<Grant>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let role = reference::resolve::<Role>(&ctx.client, &namespace, &obj.spec.role).await?;
    let database = match &obj.spec.database {
        Some(r) => Some(reference::resolve::<Database>(&ctx.client, &namespace, r).await?),
        None => None,
    };
    let schema = match &obj.spec.schema {
        Some(r) => Some(reference::resolve::<Schema>(&ctx.client, &namespace, r).await?),
        None => None,
    };
    let member_of = match &obj.spec.member_of {
        Some(r) => Some(reference::resolve::<Role>(&ctx.client, &namespace, r).await?),
        None => None,
    };
    let database = database.unwrap_or_default();
    let target = grant_target(&database, schema.as_deref(), member_of.as_deref())?;

    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("grant", &name),
            &resource_ref("grant", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            if database.is_empty() { None } else { Some(database.as_str()) },
        )
        .await?;
    ext::delete_grant(connected.connection.as_mut(), &role, &target, &obj.spec.privileges).await?;
    Ok(Action::await_change())
}

// --------------------------------------------------------- DefaultPrivileges

pub async fn reconcile_default_privileges(obj: Arc<DefaultPrivileges>, ctx: Arc<Context>) -> Result<Action> {
    let _permit = ctx.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
    let namespace = namespace_of(obj.as_ref())?;
    let client = ctx.client.clone();
    run_finalized(
        client,
        &namespace,
        DEFAULT_PRIVILEGES_FINALIZER,
        obj,
        {
            let ctx = ctx.clone();
            move |obj| apply_default_privileges(obj, ctx)
        },
        move |obj| cleanup_default_privileges(obj, ctx),
    )
    .await
}

fn object_type_char(object_type: &sqlctl_resources::postgresql::ObjectType) -> &'static str {
    use sqlctl_resources::postgresql::ObjectType;
    match object_type {
        ObjectType::Table => "r",
        ObjectType::Sequence => "S",
        ObjectType::Function => "f",
        ObjectType::Type => "T",
        ObjectType::Schema => "n",
    }
}

fn object_type_name(object_type: &sqlctl_resources::postgresql::ObjectType) -> &'static str {
    use sqlctl_resources::postgresql::ObjectType;
    match object_type {
        ObjectType::Table => "table",
        ObjectType::Sequence => "sequence",
        ObjectType::Function => "function",
        ObjectType::Type => "type",
        ObjectType::Schema => "schema",
    }
}

async fn apply_default_privileges(obj: Arc<DefaultPrivileges>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let role = reference::resolve::<Role>(&ctx.client, &namespace, &obj.spec.role).await?;
    let target_role = reference::resolve::<Role>(&ctx.client, &namespace, &obj.spec.target_role).await?;
    let database = match &obj.spec.database {
        Some(r) => Some(reference::resolve::<Database>(&ctx.client, &namespace, r).await?),
        None => None,
    };
    let schema = match &obj.spec.schema {
        Some(r) => Some(reference::resolve::<Schema>(&ctx.client, &namespace, r).await?),
        None => None,
    };
    let with_grant_option = matches!(&obj.spec.with_option, Some(sqlctl_resources::common::WithOption::Grant));

    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("defaultprivileges", &name),
            &resource_ref("defaultprivileges", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            database.as_deref(),
        )
        .await?;
    let mut connection = connected.connection;

    let observed = ext::read_default_privileges(connection.as_mut(), &role, object_type_char(&obj.spec.object_type)).await?;
    ext::reconcile_default_privileges(
        connection.as_mut(),
        &role,
        &target_role,
        schema.as_deref(),
        object_type_name(&obj.spec.object_type),
        &obj.spec.privileges,
        with_grant_option,
        &observed,
    )
    .await?;

    patch_status::<DefaultPrivileges>(
        &ctx.client,
        &namespace,
        &name,
        serde_json::json!({
            "atProvider": { "privileges": obj.spec.privileges },
            "conditions": conditions_json(true, ConditionReason::Available),
        }),
    )
    .await?;
    Ok(Action::requeue(ctx.config.poll_interval))
}

async fn cleanup_default_privileges(obj: Arc<DefaultPrivileges>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let role = reference::resolve::<Role>(&ctx.client, &namespace, &obj.spec.role).await?;
    let target_role = reference::resolve::<Role>(&ctx.client, &namespace, &obj.spec.target_role).await?;
    let database = match &obj.spec.database {
        Some(r) => Some(reference::resolve::<Database>(&ctx.client, &namespace, r).await?),
        None => None,
    };
    let schema = match &obj.spec.schema {
        Some(r) => Some(reference::resolve::<Schema>(&ctx.client, &namespace, r).await?),
        None => None,
    };
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("defaultprivileges", &name),
            &resource_ref("defaultprivileges", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            database.as_deref(),
        )
        .await?;
    // Only the REVOKE half of `create_default_privileges`'s transaction is
    // needed on delete; reusing the full Create path would also emit a
    // `GRANT` with an empty privilege list.
    let mut statements = crate::compose::postgresql::create_default_privileges(
        &role,
        &target_role,
        schema.as_deref(),
        object_type_name(&obj.spec.object_type),
        &[],
        false,
    );
    statements.truncate(1);
    connected
        .connection
        .exec_tx(&statements)
        .await
        .map_err(|e| Error::DropFailed(e.to_string()))?;
    Ok(Action::await_change())
}

// ------------------------------------------------------- ExtensionInstallation

pub async fn reconcile_extension_installation(obj: Arc<ExtensionInstallation>, ctx: Arc<Context>) -> Result<Action> {
    let _permit = ctx.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
    let namespace = namespace_of(obj.as_ref())?;
    let client = ctx.client.clone();
    run_finalized(
        client,
        &namespace,
        EXTENSION_FINALIZER,
        obj,
        {
            let ctx = ctx.clone();
            move |obj| apply_extension_installation(obj, ctx)
        },
        move |obj| cleanup_extension_installation(obj, ctx),
    )
    .await
}

async fn apply_extension_installation(obj: Arc<ExtensionInstallation>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let database = reference::resolve::<Database>(&ctx.client, &namespace, &obj.spec.database).await?;

    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("extensioninstallation", &name),
            &resource_ref("extensioninstallation", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            Some(database.as_str()),
        )
        .await?;
    ext::create_extension(connected.connection.as_mut(), &name, obj.spec.version.as_deref()).await?;

    patch_status::<ExtensionInstallation>(
        &ctx.client,
        &namespace,
        &name,
        serde_json::json!({
            "atProvider": { "installedVersion": obj.spec.version },
            "conditions": conditions_json(true, ConditionReason::Available),
        }),
    )
    .await?;
    Ok(Action::requeue(ctx.config.poll_interval))
}

async fn cleanup_extension_installation(obj: Arc<ExtensionInstallation>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let database = reference::resolve::<Database>(&ctx.client, &namespace, &obj.spec.database).await?;
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Postgres,
            &namespace,
            &usage_name("extensioninstallation", &name),
            &resource_ref("extensioninstallation", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            Some(database.as_str()),
        )
        .await?;
    ext::delete_extension(connected.connection.as_mut(), &name).await?;
    Ok(Action::await_change())
}
