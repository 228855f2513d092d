use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Args;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::json;

use crate::auth::PasswordHasher;
use crate::cli::{utils, OutputFormat};
use crate::config::AppConfig;
use crate::database::models::{NewOrganization, NewTicket, NewUser, TicketAssignment, User};
use crate::database::Store;
use crate::state::AppState;
use crate::types::{BoardId, OrganizationId, Role, Subscription, TicketPriority};

pub const CAMPUS_DOMAIN: &str = "campus.edu";
pub const CAMPUS_BOARD: &str = "campus-board";

#[derive(Args, Debug)]
pub struct SeedArgs {
    #[arg(long, default_value = "password123", help = "Password given to every seeded account")]
    pub password: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub skipped: bool,
    pub organizations: usize,
    pub users: Vec<SeededUser>,
    pub tickets: usize,
}

#[derive(Debug, Serialize)]
pub struct SeededUser {
    pub email: String,
    pub role: Role,
}

impl From<&User> for SeededUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            role: user.role,
        }
    }
}

pub async fn handle(args: SeedArgs, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = AppState::from_config(config).await?;
    let report = seed(state.store.as_ref(), &state.passwords, &args.password).await?;

    if report.skipped {
        return utils::output_success(
            &output_format,
            &format!("Sample data already present ({} exists), nothing to do", CAMPUS_DOMAIN),
            None,
        );
    }

    if let OutputFormat::Text = output_format {
        for user in &report.users {
            println!("  {:<34} {}", user.email, user.role);
        }
        println!("  password for every account: {}", args.password);
    }

    utils::output_success(
        &output_format,
        &format!(
            "Seeded {} organizations, {} users, {} tickets",
            report.organizations,
            report.users.len(),
            report.tickets
        ),
        Some(json!({ "data": report })),
    )
}

fn member(name: &str, email: &str, role: Role, org: &OrganizationId, password_hash: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        role,
        organization_id: Some(org.clone()),
        permissions: Vec::new(),
    }
}

/// Loads the sample campus data. Does nothing when the campus domain is already registered.
pub async fn seed<S>(store: &S, hasher: &PasswordHasher, password: &str) -> anyhow::Result<SeedReport>
where
    S: Store + ?Sized,
{
    if store.find_organization_by_domain(CAMPUS_DOMAIN).await?.is_some() {
        tracing::info!("Seed skipped: {} already registered", CAMPUS_DOMAIN);
        return Ok(SeedReport {
            skipped: true,
            ..Default::default()
        });
    }

    let password_hash = hasher.hash(password).context("hashing seed password")?;
    let board = BoardId::from(CAMPUS_BOARD);

    let (campus, admin) = store
        .register_organization(
            NewOrganization {
                name: "Campus Facilities".into(),
                domain: CAMPUS_DOMAIN.into(),
                board_id: None,
                subscription: Subscription::Premium,
                created_by: None,
            },
            NewUser {
                name: "Admin User".into(),
                email: "admin@campus.edu".into(),
                password_hash: password_hash.clone(),
                role: Role::Admin,
                organization_id: None,
                permissions: vec!["all".into()],
            },
        )
        .await?;

    let campuses = try_join_all(["North Campus", "South Campus"].map(|name| {
        let domain = format!("{}.{}", name.split(' ').next().unwrap_or(name).to_lowercase(), CAMPUS_DOMAIN);
        store.insert_organization(NewOrganization {
            name: name.into(),
            domain,
            board_id: Some(board.clone()),
            subscription: Subscription::Basic,
            created_by: Some(admin.id.clone()),
        })
    }))
    .await?;
    let north = &campuses[0].id;

    let mut platform_owner = member("Platform Owner", "owner@campus.edu", Role::Superadmin, &campus.id, &password_hash);
    platform_owner.permissions = vec!["all".into()];

    let users = try_join_all([
        member("Alex Johnson", "alex.johnson@campus.edu", Role::Student, &campus.id, &password_hash),
        member("Sarah Wilson", "sarah.wilson@campus.edu", Role::Staff, &campus.id, &password_hash),
        member("Board Admin", "board.admin@north.campus.edu", Role::BoardAdmin, north, &password_hash),
        member("North Staff", "staff@north.campus.edu", Role::Staff, north, &password_hash),
        platform_owner,
    ]
    .map(|user| store.insert_identity(user)))
    .await?;
    let (student, staff) = (&users[0], &users[1]);

    let ac = store
        .insert_ticket(NewTicket {
            organization_id: campus.id.clone(),
            title: "Broken AC in Room 101".into(),
            description: "Air conditioning not working properly".into(),
            category: "HVAC".into(),
            location: Some("Room 101".into()),
            priority: TicketPriority::High,
            created_by: student.id.clone(),
        })
        .await?;
    store
        .assign_ticket(
            &ac.id,
            TicketAssignment {
                assigned_to: staff.id.clone(),
                due_date: Some(Utc::now() + Duration::days(2)),
                priority: None,
            },
        )
        .await?;

    store
        .insert_ticket(NewTicket {
            organization_id: campus.id.clone(),
            title: "Water leak in Bathroom".into(),
            description: "Water leaking from the ceiling".into(),
            category: "Plumbing".into(),
            location: Some("2nd floor bathroom".into()),
            priority: TicketPriority::Critical,
            created_by: student.id.clone(),
        })
        .await?;

    let mut seeded: Vec<SeededUser> = vec![SeededUser::from(&admin)];
    seeded.extend(users.iter().map(SeededUser::from));

    tracing::info!("Seeded campus data: {} users", seeded.len());

    Ok(SeedReport {
        skipped: false,
        organizations: 1 + campuses.len(),
        users: seeded,
        tickets: 2,
    })
}
