//! Enterprise administration steps

use cucumber::{then, when};
use serde_json::json;

use crate::common::{register_request, RegisteredEnterprise};
use crate::features::support::TestWorld;

#[when(expr = "the admin registers {string}")]
async fn admin_registers(world: &mut TestWorld, name: String) {
    let response = world
        .app()
        .admin("POST", "/api/v1/enterprises", Some(register_request(&name)))
        .await;
    if response.status.is_success() {
        let registered: RegisteredEnterprise = response.json();
        world.enterprises.insert(name, registered);
    }
    world.last_response = Some(response);
}

#[when(expr = "the admin deactivates {string}")]
async fn admin_deactivates(world: &mut TestWorld, name: String) {
    let id = world.enterprise(&name).enterprise_id;
    let response = world
        .app()
        .admin(
            "PUT",
            &format!("/api/v1/enterprises/{}/status", id),
            Some(json!({"is_active": false})),
        )
        .await;
    response.assert_ok();
    world.last_response = Some(response);
}

#[then(expr = "{string} holds a {int}-character api key and a {int}-character secret key")]
async fn credential_lengths(world: &mut TestWorld, name: String, api_len: usize, secret_len: usize) {
    let registered = world.enterprise(&name);
    assert_eq!(registered.api_key.len(), api_len);
    assert_eq!(registered.secret_key.len(), secret_len);
}

#[then(expr = "listing enterprises does not reveal the secret key of {string}")]
async fn listing_hides_secret(world: &mut TestWorld, name: String) {
    let secret_key = world.enterprise(&name).secret_key.clone();
    let response = world.app().admin("GET", "/api/v1/enterprises", None).await;
    response.assert_ok();
    assert!(!response.text().contains(&secret_key));
}
