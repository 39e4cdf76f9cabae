//! Directory service documents
//!
//! Builders producing catalog and service-endpoint XML in the shape the
//! directory service returns.

/// One `ServerOption` generic resource
#[derive(Debug, Clone)]
pub struct ServerOptionXml {
    auth_id: String,
    name: String,
    description: String,
    catalog_name: String,
    role: Option<String>,
    image: Option<String>,
    cores: Option<String>,
    memory: Option<(String, String)>,
    gpu: Option<String>,
    default: bool,
}

impl ServerOptionXml {
    /// Option of the default option-type with an auth id and display name
    pub fn new(auth_id: &str, name: &str) -> Self {
        Self {
            auth_id: auth_id.to_string(),
            name: name.to_string(),
            description: format!("{name} environment"),
            catalog_name: "ServerOption".to_string(),
            role: None,
            image: None,
            cores: None,
            memory: None,
            gpu: None,
            default: false,
        }
    }

    /// Option-type name (`Profile/Name`)
    pub fn catalog_name(mut self, catalog_name: &str) -> Self {
        self.catalog_name = catalog_name.to_string();
        self
    }

    /// Required role
    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// Container image
    pub fn image(mut self, image: &str) -> Self {
        self.image = Some(image.to_string());
        self
    }

    /// CPU cores, verbatim
    pub fn cores(mut self, cores: &str) -> Self {
        self.cores = Some(cores.to_string());
        self
    }

    /// Memory amount and unit
    pub fn memory(mut self, value: &str, unit: &str) -> Self {
        self.memory = Some((value.to_string(), unit.to_string()));
        self
    }

    /// Raw value of the `gpu` attribute
    pub fn gpu(mut self, flag: &str) -> Self {
        self.gpu = Some(flag.to_string());
        self
    }

    /// Mark as the context default
    pub fn default_option(mut self) -> Self {
        self.default = true;
        self
    }

    fn render(&self) -> String {
        let mut attrs = String::new();
        if self.default {
            attrs.push_str(r#" default="true""#);
        }
        if let Some(gpu) = &self.gpu {
            attrs.push_str(&format!(r#" gpu="{gpu}""#));
        }
        if let Some(role) = &self.role {
            attrs.push_str(&format!(r#" role="{role}""#));
        }

        let mut body = format!(
            "<AuthId>{}</AuthId><Info><Name>{}</Name><Description>{}</Description></Info>",
            self.auth_id, self.name, self.description
        );
        if let Some(image) = &self.image {
            body.push_str(&format!("<ImageId>{image}</ImageId>"));
        }
        if self.cores.is_some() || self.memory.is_some() {
            body.push_str("<Cut>");
            if let Some(cores) = &self.cores {
                body.push_str(&format!("<Cores>{cores}</Cores>"));
            }
            if let Some((value, unit)) = &self.memory {
                body.push_str(&format!(r#"<Memory unit="{unit}">{value}</Memory>"#));
            }
            body.push_str("</Cut>");
        }

        resource(
            &self.catalog_name,
            &format!("<ServerOption{attrs}>{body}</ServerOption>"),
        )
    }
}

fn resource(name: &str, body: &str) -> String {
    format!(
        "<Resource version=\"0.4.x\"><ID>{name}-id</ID><Type>GenericResource</Type>\
         <Profile><SecondaryType>JupyterHub</SecondaryType><Name>{name}</Name>\
         <Description/><Body>{body}</Body></Profile></Resource>"
    )
}

/// Catalog document builder
#[derive(Debug, Clone, Default)]
pub struct CatalogXml {
    resources: Vec<String>,
}

impl CatalogXml {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server option
    pub fn server_option(mut self, option: ServerOptionXml) -> Self {
        self.resources.push(option.render());
        self
    }

    /// Add a volume option with the catalog permission spelling
    pub fn volume(mut self, name: &str, permission: &str) -> Self {
        self.resources.push(resource(
            "VolumeOption",
            &format!(
                "<VolumeOption><Name>{name}</Name><Permission>{permission}</Permission></VolumeOption>"
            ),
        ));
        self
    }

    /// Add a verbatim `Resource` element
    pub fn raw_resource(mut self, xml: &str) -> Self {
        self.resources.push(xml.to_string());
        self
    }

    /// Render the document
    pub fn build(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<genericResources>{}</genericResources>",
            self.resources.concat()
        )
    }
}

/// Service-endpoint document with one access point per `(entry name, url)`
pub fn service_endpoints_xml(access_points: &[(&str, &str)]) -> String {
    let access_points: String = access_points
        .iter()
        .map(|(entry, url)| {
            format!(
                "<AccessPoint><Description/><Interface>\
                 <Endpoint EntryName=\"{entry}\">{url}</Endpoint></Interface>\
                 <AccessData><Username/><Password/></AccessData></AccessPoint>"
            )
        })
        .collect();
    format!(
        "<serviceEndpoints><Resource version=\"0.4.x\"><ID>dm</ID><Type>RuntimeResource</Type>\
         <Profile><Category>DataAnalysis</Category><Name>DataMiner</Name>{access_points}\
         </Profile></Resource></serviceEndpoints>"
    )
}
