//! Entity types the admin tool knows about

use chrono::{DateTime, Utc};
use xmlstore::metadata::{Declaration, Entity, EntityId, PropertyDescriptor, Timestamps};
use xmlstore::storage_enum;

storage_enum! {
    #[derive(Default)]
    pub enum Gender {
        #[default]
        Male = "m",
        Female = "f",
    }
}

/// Application account
#[derive(Debug, Clone, Default)]
pub struct User {
    pub id: EntityId,
    pub timestamps: Timestamps,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub username: String,
    pub state: i64,
    pub password: String,
    pub role: String,
    pub apikey: String,
    pub last_logged_at: Option<DateTime<Utc>>,
}

impl Entity for User {
    const NAME: &'static str = "User";

    fn declare(decl: &mut Declaration<Self>) {
        Timestamps::declare(decl, |u| &u.timestamps, |u| &mut u.timestamps);

        decl.property("name")
            .descriptor(PropertyDescriptor::string())
            .field(|u| &u.name, |u| &mut u.name);
        decl.property("surname")
            .descriptor(PropertyDescriptor::string())
            .field(|u| &u.surname, |u| &mut u.surname);
        decl.property("email")
            .descriptor(PropertyDescriptor::string().unique())
            .field(|u| &u.email, |u| &mut u.email);
        decl.property("username")
            .descriptor(PropertyDescriptor::string().unique())
            .field(|u| &u.username, |u| &mut u.username);
        decl.property("state")
            .descriptor(PropertyDescriptor::integer())
            .field(|u| &u.state, |u| &mut u.state);
        decl.property("password")
            .descriptor(PropertyDescriptor::string())
            .field(|u| &u.password, |u| &mut u.password);
        decl.property("role")
            .descriptor(PropertyDescriptor::string())
            .field(|u| &u.role, |u| &mut u.role);
        decl.property("apikey")
            .descriptor(PropertyDescriptor::string())
            .field(|u| &u.apikey, |u| &mut u.apikey);
        decl.property("lastLoggedAt")
            .descriptor(PropertyDescriptor::datetime().nullable())
            .field(|u| &u.last_logged_at, |u| &mut u.last_logged_at);
    }

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn entity_id_mut(&mut self) -> &mut EntityId {
        &mut self.id
    }
}

/// Staff record
#[derive(Debug, Clone, Default)]
pub struct Employee {
    pub id: EntityId,
    pub timestamps: Timestamps,
    pub name: String,
    pub age: i64,
    pub gender: Gender,
}

impl Entity for Employee {
    const NAME: &'static str = "Employee";

    fn declare(decl: &mut Declaration<Self>) {
        Timestamps::declare(decl, |e| &e.timestamps, |e| &mut e.timestamps);

        decl.property("name")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.name, |e| &mut e.name);
        decl.property("age")
            .descriptor(PropertyDescriptor::integer().unique())
            .field(|e| &e.age, |e| &mut e.age);
        decl.property("gender")
            .descriptor(PropertyDescriptor::string())
            .field(|e| &e.gender, |e| &mut e.gender);
    }

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn entity_id_mut(&mut self) -> &mut EntityId {
        &mut self.id
    }
}
