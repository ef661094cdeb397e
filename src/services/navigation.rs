// src/services/navigation.rs
//! Mapa estático página -> perfis e filtros de visibilidade.
use crate::{
    models::{user::Role, Owned},
    services::session_service::SessionContext,
};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Dashboard,
    Opportunities,
    MyEnrollments,
    ApprovalRequests,
    Certificates,
    Groups,
    Ppc,
    Reports,
    Communications,
    PublicPortal,
    Users,
    Settings,
}

use crate::models::user::Role::{
    Administrador as Adm, Coordenador as Coo, Discente as Dis, Docente as Doc, Secretaria as Sec,
};

impl Page {
    /// Ordem da barra lateral.
    pub const ALL: [Page; 12] = [
        Page::Dashboard,
        Page::Opportunities,
        Page::MyEnrollments,
        Page::ApprovalRequests,
        Page::Certificates,
        Page::Groups,
        Page::Ppc,
        Page::Reports,
        Page::Communications,
        Page::PublicPortal,
        Page::Users,
        Page::Settings,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Opportunities => "opportunities",
            Page::MyEnrollments => "my-enrollments",
            Page::ApprovalRequests => "approval-requests",
            Page::Certificates => "certificates",
            Page::Groups => "groups",
            Page::Ppc => "ppc",
            Page::Reports => "reports",
            Page::Communications => "communications",
            Page::PublicPortal => "public-portal",
            Page::Users => "users",
            Page::Settings => "settings",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Page::Dashboard => "/dashboard",
            Page::Opportunities => "/opportunities",
            Page::MyEnrollments => "/my-enrollments",
            Page::ApprovalRequests => "/approval-requests",
            Page::Certificates => "/certificates",
            Page::Groups => "/groups",
            Page::Ppc => "/ppc",
            Page::Reports => "/reports",
            Page::Communications => "/communications",
            Page::PublicPortal => "/public-portal",
            Page::Users => "/users",
            Page::Settings => "/settings",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Opportunities => "Oportunidades",
            Page::MyEnrollments => "Minhas Inscrições",
            Page::ApprovalRequests => "Aproveitamento",
            Page::Certificates => "Certificados",
            Page::Groups => "Grupos",
            Page::Ppc => "PPC",
            Page::Reports => "Relatórios",
            Page::Communications => "Comunicações",
            Page::PublicPortal => "Portal Público",
            Page::Users => "Gerenciar Usuários",
            Page::Settings => "Configurações",
        }
    }

    pub fn roles(&self) -> &'static [Role] {
        match self {
            Page::Dashboard => &[Dis, Doc, Coo, Sec, Adm],
            Page::Opportunities | Page::Certificates | Page::PublicPortal => &[Dis, Doc, Coo, Sec],
            Page::MyEnrollments => &[Dis],
            Page::ApprovalRequests => &[Dis, Coo, Sec],
            Page::Groups => &[Doc, Coo, Adm],
            Page::Ppc | Page::Communications => &[Coo, Sec],
            Page::Reports => &[Coo, Sec, Adm],
            Page::Users | Page::Settings => &[Adm],
        }
    }

    pub fn is_visible_to(&self, role: Role) -> bool {
        self.roles().contains(&role)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Page {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|page| page.id() == s)
            .ok_or(crate::error::AppError::NotFound("página"))
    }
}

/// Páginas da barra lateral para o perfil ativo.
pub fn visible_pages(role: Role) -> Vec<Page> {
    Page::ALL.into_iter().filter(|page| page.is_visible_to(role)).collect()
}

/// Entrada da navegação inferior em ecrãs pequenos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileNavItem {
    pub id: &'static str,
    pub label: &'static str,
    pub path: &'static str,
}

impl From<Page> for MobileNavItem {
    fn from(page: Page) -> Self {
        Self {
            id: page.id(),
            label: if page == Page::Dashboard { "Início" } else { page.label() },
            path: page.path(),
        }
    }
}

/// Início, oportunidades, (aproveitamento e certificados só para discente) e menu.
pub fn mobile_nav(role: Role) -> Vec<MobileNavItem> {
    let mut items: Vec<MobileNavItem> = vec![Page::Dashboard.into(), Page::Opportunities.into()];
    if role == Role::Discente {
        items.push(Page::ApprovalRequests.into());
        items.push(Page::Certificates.into());
    }
    items.push(MobileNavItem {
        id: "menu",
        label: "Menu",
        path: "#menu",
    });
    items
}

/// No perfil discente só ficam os registos do próprio utilizador.
pub fn filter_owned<T: Owned>(items: Vec<T>, ctx: &SessionContext) -> Vec<T> {
    match (ctx.role(), ctx.user()) {
        (Some(Role::Discente), Some(user)) => items
            .into_iter()
            .filter(|item| item.owner_id() == user.id)
            .collect(),
        (Some(Role::Discente), None) | (None, _) => Vec::new(),
        _ => items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn ids(pages: &[Page]) -> Vec<&'static str> {
        pages.iter().map(Page::id).collect()
    }

    #[test]
    fn discente_sidebar() {
        assert_eq!(
            ids(&visible_pages(Role::Discente)),
            vec![
                "dashboard",
                "opportunities",
                "my-enrollments",
                "approval-requests",
                "certificates",
                "public-portal"
            ]
        );
    }

    #[test]
    fn coordenador_sidebar() {
        assert_eq!(
            ids(&visible_pages(Role::Coordenador)),
            vec![
                "dashboard",
                "opportunities",
                "approval-requests",
                "certificates",
                "groups",
                "ppc",
                "reports",
                "communications",
                "public-portal"
            ]
        );
    }

    #[test]
    fn docente_sidebar() {
        assert_eq!(
            ids(&visible_pages(Role::Docente)),
            vec!["dashboard", "opportunities", "certificates", "groups", "public-portal"]
        );
    }

    #[test]
    fn secretaria_sidebar() {
        assert_eq!(
            ids(&visible_pages(Role::Secretaria)),
            vec![
                "dashboard",
                "opportunities",
                "approval-requests",
                "certificates",
                "ppc",
                "reports",
                "communications",
                "public-portal"
            ]
        );
    }

    #[test]
    fn administrador_sidebar() {
        assert_eq!(
            ids(&visible_pages(Role::Administrador)),
            vec!["dashboard", "groups", "reports", "users", "settings"]
        );
    }

    #[test]
    fn dashboard_is_visible_to_every_role() {
        for role in Role::ALL {
            assert!(visible_pages(role).contains(&Page::Dashboard));
        }
    }

    #[test]
    fn mobile_nav_depends_on_role() {
        let student: Vec<_> = mobile_nav(Role::Discente).iter().map(|i| i.id).collect();
        assert_eq!(
            student,
            vec!["dashboard", "opportunities", "approval-requests", "certificates", "menu"]
        );
        for role in [Role::Docente, Role::Coordenador, Role::Secretaria, Role::Administrador] {
            let items: Vec<_> = mobile_nav(role).iter().map(|i| i.id).collect();
            assert_eq!(items, vec!["dashboard", "opportunities", "menu"]);
        }
    }

    #[test]
    fn page_ids_round_trip() {
        for page in Page::ALL {
            assert_eq!(page.id().parse::<Page>().unwrap(), page);
        }
        assert!("inexistente".parse::<Page>().is_err());
    }

    #[test]
    fn owned_collections_are_filtered_for_students_only() {
        let requests = fixtures::approval_requests();
        let total = requests.len();
        let joao = fixtures::users().remove(0);

        let student = SessionContext::for_tests(joao.clone(), Role::Discente);
        let visible = filter_owned(requests.clone(), &student);
        assert!(!visible.is_empty());
        assert!(visible.iter().all(|r| r.user_id == joao.id));
        assert!(visible.len() < total);

        let carlos = fixtures::users().remove(2);
        let coordinator = SessionContext::for_tests(carlos, Role::Coordenador);
        assert_eq!(filter_owned(requests, &coordinator).len(), total);

        assert!(filter_owned(fixtures::certificates(), &SessionContext::default()).is_empty());
    }
}
