//! Reconcilers for the four HANA kinds: User, Role, Usergroup, DbSchema.
//! Same Observe/Create/Update/Delete shape as the other dialects, wired to
//! `crate::external::hana` and `crate::compose::hana`. Scenario S6 (role
//! LDAP groups) lives in the Role apply path below.

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use sqlctl_core::{password_drift, ConnectionDetails, Error, Result};
use sqlctl_resources::hana::{DbSchema, Role, User, Usergroup};
use sqlctl_resources::status::ConditionReason;

use crate::connector::{Connector, Dialect};
use crate::credentials::ProviderConfigRef;
use crate::external::hana as ext;
use crate::reconcile::{
    conditions_json, namespace_of, patch_status, read_connection_details, requeue_after,
    resolve_principal_password, resource_ref, run_finalized, usage_name, write_connection_details,
    Context,
};
use crate::reference;

const USER_FINALIZER: &str = "hana.sql.internal/user";
const ROLE_FINALIZER: &str = "hana.sql.internal/role";
const USERGROUP_FINALIZER: &str = "hana.sql.internal/usergroup";
const DBSCHEMA_FINALIZER: &str = "hana.sql.internal/dbschema";

fn provider_ref(namespace: &str, provider_config_ref: &str) -> ProviderConfigRef {
    ProviderConfigRef::Namespaced { namespace: namespace.to_string(), name: provider_config_ref.to_string() }
}

pub fn error_policy<K>(_obj: Arc<K>, error: &Error, _ctx: Arc<Context>) -> Action {
    requeue_after(error)
}

// -------------------------------------------------------------------- User

pub async fn reconcile_user(obj: Arc<User>, ctx: Arc<Context>) -> Result<Action> {
    let _permit = ctx.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
    let namespace = namespace_of(obj.as_ref())?;
    let client = ctx.client.clone();
    run_finalized(
        client,
        &namespace,
        USER_FINALIZER,
        obj,
        {
            let ctx = ctx.clone();
            move |obj| apply_user(obj, ctx)
        },
        move |obj| cleanup_user(obj, ctx),
    )
    .await
}

async fn apply_user(obj: Arc<User>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let usergroup = match &obj.spec.usergroup {
        Some(r) => Some(reference::resolve::<Usergroup>(&ctx.client, &namespace, r).await?),
        None => None,
    };

    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Hana,
            &namespace,
            &usage_name("user", &name),
            &resource_ref("user", &namespace, &name),
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

    let observed = ext::observe_user(connection.as_mut(), &name).await?;
    if !observed.exists {
        ext::create_user(
            connection.as_mut(),
            &name,
            &spec_password,
            obj.spec.restricted,
            obj.spec.force_first_password_change,
            &obj.spec.parameters,
            usergroup.as_deref(),
        )
        .await?;
    } else {
        if let Some(details) = &existing_details {
            let connection_details_password =
                details.get("password").map(|v| String::from_utf8_lossy(v).into_owned()).unwrap_or_default();
            if password_drift(&spec_password, &connection_details_password) {
                ext::update_user_password(connection.as_mut(), &name, &spec_password).await?;
            }
        }
        let observed_parameters = ext::read_user_parameters(connection.as_mut(), &name).await?;
        ext::reconcile_user_parameters(connection.as_mut(), &name, &obj.spec.parameters, &observed_parameters).await?;
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

    patch_status::<User>(
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

async fn cleanup_user(obj: Arc<User>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Hana,
            &namespace,
            &usage_name("user", &name),
            &resource_ref("user", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            None,
        )
        .await?;
    ext::delete_user(connected.connection.as_mut(), &name).await?;
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
            Dialect::Hana,
            &namespace,
            &usage_name("role", &name),
            &resource_ref("role", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            None,
        )
        .await?;
    let mut connection = connected.connection;

    let observed_exists = ext::observe_role(connection.as_mut(), &name).await?;
    if !observed_exists {
        // Scenario S6.
        ext::create_role(connection.as_mut(), &name, &obj.spec.ldap_groups, obj.spec.no_grant_to_creator).await?;
    }

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
            Dialect::Hana,
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

// --------------------------------------------------------------- Usergroup

pub async fn reconcile_usergroup(obj: Arc<Usergroup>, ctx: Arc<Context>) -> Result<Action> {
    let _permit = ctx.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
    let namespace = namespace_of(obj.as_ref())?;
    let client = ctx.client.clone();
    run_finalized(
        client,
        &namespace,
        USERGROUP_FINALIZER,
        obj,
        {
            let ctx = ctx.clone();
            move |obj| apply_usergroup(obj, ctx)
        },
        move |obj| cleanup_usergroup(obj, ctx),
    )
    .await
}

async fn apply_usergroup(obj: Arc<Usergroup>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Hana,
            &namespace,
            &usage_name("usergroup", &name),
            &resource_ref("usergroup", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            None,
        )
        .await?;
    let mut connection = connected.connection;

    let observed = ext::observe_usergroup(connection.as_mut(), &name).await?;
    if !observed.exists {
        ext::create_usergroup(
            connection.as_mut(),
            &name,
            obj.spec.disable_user_admin,
            obj.spec.no_grant_to_creator,
            &obj.spec.parameters,
            obj.spec.enable_parameter_set.as_deref(),
        )
        .await?;
    }

    patch_status::<Usergroup>(
        &ctx.client,
        &namespace,
        &name,
        serde_json::json!({
            "atProvider": { "exists": true, "parameters": obj.spec.parameters },
            "conditions": conditions_json(true, ConditionReason::Available),
        }),
    )
    .await?;
    Ok(Action::requeue(ctx.config.poll_interval))
}

async fn cleanup_usergroup(obj: Arc<Usergroup>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Hana,
            &namespace,
            &usage_name("usergroup", &name),
            &resource_ref("usergroup", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            None,
        )
        .await?;
    ext::delete_usergroup(connected.connection.as_mut(), &name).await?;
    Ok(Action::await_change())
}

// ---------------------------------------------------------------- DbSchema

pub async fn reconcile_dbschema(obj: Arc<DbSchema>, ctx: Arc<Context>) -> Result<Action> {
    let _permit = ctx.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
    let namespace = namespace_of(obj.as_ref())?;
    let client = ctx.client.clone();
    run_finalized(
        client,
        &namespace,
        DBSCHEMA_FINALIZER,
        obj,
        {
            let ctx = ctx.clone();
            move |obj| apply_dbschema(obj, ctx)
        },
        move |obj| cleanup_dbschema(obj, ctx),
    )
    .await
}

async fn apply_dbschema(obj: Arc<DbSchema>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let owner = reference::resolve::<User>(&ctx.client, &namespace, &obj.spec.owner).await?;

    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Hana,
            &namespace,
            &usage_name("dbschema", &name),
            &resource_ref("dbschema", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            None,
        )
        .await?;
    let mut connection = connected.connection;

    match ext::observe_dbschema(connection.as_mut(), &name).await {
        Ok(_current_owner) => {}
        Err(Error::NoRows) => {
            ext::create_dbschema(connection.as_mut(), &name, &owner).await?;
        }
        Err(e) => return Err(e),
    }

    patch_status::<DbSchema>(
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

async fn cleanup_dbschema(obj: Arc<DbSchema>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let name = obj.name_any();
    let connector = Connector { client: ctx.client.clone(), object_store: ctx.object_store.as_ref() };
    let reference = provider_ref(&namespace, &obj.spec.provider_config_ref);
    let connected = connector
        .connect(
            Dialect::Hana,
            &namespace,
            &usage_name("dbschema", &name),
            &resource_ref("dbschema", &namespace, &name),
            &reference,
            &obj.spec.provider_config_ref,
            None,
        )
        .await?;
    ext::delete_dbschema(connected.connection.as_mut(), &name).await?;
    Ok(Action::await_change())
}
