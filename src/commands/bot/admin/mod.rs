pub mod reaction_role;
