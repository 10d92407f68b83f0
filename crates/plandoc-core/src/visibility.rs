use crate::models::{OrgKind, Visibility};

impl Visibility {
    /// Classification assigned at creation from the owning org's kind.
    /// Funder-only orgs publish publicly; anything with an organisation or
    /// institution facet stays organisationally scoped.
    #[must_use]
    pub fn for_org(kind: OrgKind) -> Self {
        match kind {
            OrgKind::Funder => Self::PubliclyVisible,
            OrgKind::Organisation | OrgKind::Institution | OrgKind::FunderAndOrganisation => {
                Self::OrganisationallyVisible
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{OrgKind, Visibility};

    #[test]
    fn funder_only_orgs_get_publicly_visible() {
        assert_eq!(
            Visibility::for_org(OrgKind::Funder),
            Visibility::PubliclyVisible
        );
    }

    #[test]
    fn organisation_like_orgs_get_organisationally_visible() {
        for kind in [
            OrgKind::Organisation,
            OrgKind::Institution,
            OrgKind::FunderAndOrganisation,
        ] {
            assert_eq!(
                Visibility::for_org(kind),
                Visibility::OrganisationallyVisible,
                "unexpected visibility for {kind:?}"
            );
        }
    }
}
